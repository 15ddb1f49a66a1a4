// Token-level parsers shared by the request grammar

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::map,
    sequence::delimited,
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Bare word such as `Gender`, `Tax_5%` or `pie`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '%' | '.')),
        str::to_string,
    )(input)
}

/// Single- or double-quoted text, no escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((double_quoted, single_quoted))(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    map(delimited(char('"'), take_while(|c: char| c != '"'), char('"')), str::to_string)(input)
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    map(delimited(char('\''), take_while(|c: char| c != '\''), char('\'')), str::to_string)(input)
}

/// Argument value: quoted text or a bare word
pub fn argument_value(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier))(input)
}
