// Page requests and shell meta commands
//
//   home()
//   uni(column: "Gender", chart: "Pie Chart")
//   bi(first: "Unit price", second: Quantity, chart: line)
//   multi(first: Total, second: Rating, color: Branch, chart: "Box Plot")

use super::lexer::{argument_value, ws};
use crate::error::RequestError;
use crate::ir::{AnalysisMode, PageRequest, Selection};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace1},
    combinator::{all_consuming, map, opt, value},
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};

/// One line typed into the shell
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Show(PageRequest),
    Help,
    Modes,
    Columns(AnalysisMode),
    Quit,
}

/// Mode keyword; long forms are tried first so `bi` does not shadow `bivariate`
fn mode_keyword(input: &str) -> IResult<&str, AnalysisMode> {
    alt((
        value(AnalysisMode::Home, tag_no_case("home")),
        value(
            AnalysisMode::Univariate,
            alt((tag_no_case("univariate"), tag_no_case("uni"))),
        ),
        value(
            AnalysisMode::Bivariate,
            alt((tag_no_case("bivariate"), tag_no_case("bi"))),
        ),
        value(
            AnalysisMode::Multivariate,
            alt((tag_no_case("multivariate"), tag_no_case("multi"))),
        ),
    ))(input)
}

/// `key: value`
fn argument(input: &str) -> IResult<&str, (&str, String)> {
    let (input, key) = ws(alt((
        tag_no_case("column"),
        tag_no_case("first"),
        tag_no_case("second"),
        tag_no_case("colour"),
        tag_no_case("color"),
        tag_no_case("chart"),
    )))(input)?;
    let (input, _) = ws(char(':'))(input)?;
    let (input, val) = ws(argument_value)(input)?;
    Ok((input, (key, val)))
}

/// Mode keyword with an optional parenthesised argument list
fn page_request(input: &str) -> IResult<&str, (AnalysisMode, Vec<(&str, String)>)> {
    let (input, mode) = ws(mode_keyword)(input)?;
    let (input, args) = opt(delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), argument),
        ws(char(')')),
    ))(input)?;
    Ok((input, (mode, args.unwrap_or_default())))
}

fn meta_command(input: &str) -> IResult<&str, ShellCommand> {
    alt((
        value(ShellCommand::Help, tag_no_case("help")),
        value(ShellCommand::Modes, tag_no_case("modes")),
        value(ShellCommand::Quit, alt((tag_no_case("quit"), tag_no_case("exit")))),
        map(
            preceded(tag_no_case("columns"), preceded(multispace1, mode_keyword)),
            ShellCommand::Columns,
        ),
    ))(input)
}

/// Place each argument into the selection slot its mode allows
fn build_request(
    mode: AnalysisMode,
    args: Vec<(&str, String)>,
) -> Result<PageRequest, RequestError> {
    let mut selection = Selection::default();
    for (key, val) in args {
        let key = key.to_ascii_lowercase();
        let slot = match (mode, key.as_str()) {
            (_, "chart") if mode != AnalysisMode::Home => &mut selection.chart,
            (AnalysisMode::Univariate, "column" | "first") => &mut selection.first,
            (AnalysisMode::Bivariate | AnalysisMode::Multivariate, "first") => &mut selection.first,
            (AnalysisMode::Bivariate | AnalysisMode::Multivariate, "second") => {
                &mut selection.second
            }
            (AnalysisMode::Multivariate, "color" | "colour") => &mut selection.color,
            _ => return Err(RequestError::UnexpectedArgument { mode, key }),
        };
        *slot = Some(val);
    }
    Ok(PageRequest::new(mode, selection))
}

fn syntax_error(input: &str, err: nom::Err<nom::error::Error<&str>>) -> RequestError {
    let message = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) if e.input.trim().is_empty() => {
            format!("unexpected end of input in '{}'", input.trim())
        }
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("unexpected input at '{}'", e.input.trim())
        }
        nom::Err::Incomplete(_) => format!("incomplete request '{}'", input.trim()),
    };
    RequestError::Syntax(message)
}

/// Parse a page request such as `uni(column: Gender, chart: pie)`
pub fn parse_request(input: &str) -> Result<PageRequest, RequestError> {
    let (_, (mode, args)) = all_consuming(page_request)(input).map_err(|e| syntax_error(input, e))?;
    build_request(mode, args)
}

/// Parse one shell line: a meta command or a page request
pub fn parse_command(input: &str) -> Result<ShellCommand, RequestError> {
    if let Ok((_, command)) = all_consuming(ws(meta_command))(input) {
        return Ok(command);
    }
    parse_request(input).map(ShellCommand::Show)
}
