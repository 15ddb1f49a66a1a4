//! Page navigation: one handler per analysis mode.
//!
//! Every request is handled from scratch. A page derives its selectable
//! columns and defaults from the table, resolves the user's selection into a
//! chart request, and hands it to the selector.

use tracing::warn;

use crate::classify::classify;
use crate::dataset::Table;
use crate::error::SelectionError;
use crate::ir::{AnalysisMode, ChartKind, ChartRequest, Selection};
use crate::selector::select;
use crate::transform::build_figure;
use crate::view::{PageView, Preview, Section};
use crate::RenderOptions;

/// A page of the dashboard
pub trait Page {
    fn mode(&self) -> AnalysisMode;

    fn render(&self, table: &Table, selection: &Selection, options: &RenderOptions) -> PageView;
}

pub struct HomePage;
pub struct UnivariatePage;
pub struct BivariatePage;
pub struct MultivariatePage;

/// Handler for `mode`
pub fn page_for(mode: AnalysisMode) -> &'static dyn Page {
    match mode {
        AnalysisMode::Home => &HomePage,
        AnalysisMode::Univariate => &UnivariatePage,
        AnalysisMode::Bivariate => &BivariatePage,
        AnalysisMode::Multivariate => &MultivariatePage,
    }
}

/// Columns offered by the mode's selectors, in header order
pub fn offered_columns(table: &Table, mode: AnalysisMode) -> Vec<&str> {
    table
        .headers()
        .filter(|h| mode.offers(h))
        .collect()
}

/// A page that draws one chart from its column and chart selectors
pub trait AnalysisPage: Page {
    /// Chart kind selected before the user picks one
    fn default_chart(&self) -> ChartKind;

    fn request(&self, selectors: Selectors) -> ChartRequest;
}

/// Selector values with unset entries replaced by the page defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Selectors {
    pub first: String,
    pub second: String,
    pub color: String,
    pub chart: ChartKind,
}

/// Fill unset selections with defaults and parse the chart kind
pub fn resolve_request(
    page: &dyn AnalysisPage,
    table: &Table,
    selection: &Selection,
) -> Result<ChartRequest, SelectionError> {
    let mode = page.mode();
    let default_column = offered_columns(table, mode)
        .first()
        .map(|c| c.to_string())
        .ok_or(SelectionError::NoColumns(mode))?;
    let pick = |chosen: &Option<String>| chosen.clone().unwrap_or_else(|| default_column.clone());

    let chart = match &selection.chart {
        Some(name) => name.parse::<ChartKind>()?,
        None => page.default_chart(),
    };

    Ok(page.request(Selectors {
        first: pick(&selection.first),
        second: pick(&selection.second),
        color: pick(&selection.color),
        chart,
    }))
}

impl Page for HomePage {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Home
    }

    fn render(&self, table: &Table, _selection: &Selection, _options: &RenderOptions) -> PageView {
        let mut view = PageView::new(self.mode());

        view.heading("Welcome to the Supermarket Sales Analysis App!");
        view.text(
            "Explore the insights of supermarket sales data with interactive visualizations.\n\
             Use the page selector to navigate through various analyses and discover trends, patterns, and key metrics.",
        );

        view.heading("What You Can Do");
        view.text(
            "- Analyze sales trends over time.\n\
             - Compare sales across different branches and product lines.\n\
             - Visualize customer demographics and preferences.\n\
             - Gain insights into sales performance and customer behavior.",
        );

        view.heading("Dataset Overview");
        view.push(Section::Preview(Preview::all(table)));
        view.text(FEATURE_GLOSSARY);

        view.heading("Navigation Tips");
        view.text(
            "- Switch between the analysis pages with home(), uni(...), bi(...) and multi(...).\n\
             - Select columns and chart types to customize your visualizations.\n\
             - Type `columns <page>` to list the columns a page offers.",
        );

        view
    }
}

const FEATURE_GLOSSARY: &str = "\
The dataset includes the following key features:
- Invoice ID: Unique identifier for each transaction
- Branch: Store location
- City: City of the store
- Customer Type: Type of customer (e.g., Member, Normal)
- Gender: Gender of the customer
- Product Line: Category of products sold
- Unit Price: Price per unit of product
- Quantity: Number of units sold
- Tax 5%: Tax applied to the sale
- Total: Total sale amount
- Date: Date of transaction
- Time: Time of transaction
- Payment Method: Method of payment used
- Rating: Customer rating of the transaction";

impl Page for UnivariatePage {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Univariate
    }

    fn render(&self, table: &Table, selection: &Selection, options: &RenderOptions) -> PageView {
        analysis_view(self, table, selection, options)
    }
}

impl AnalysisPage for UnivariatePage {
    fn default_chart(&self) -> ChartKind {
        ChartKind::Histogram
    }

    fn request(&self, selectors: Selectors) -> ChartRequest {
        ChartRequest::Univariate {
            column: selectors.first,
            chart: selectors.chart,
        }
    }
}

impl Page for BivariatePage {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Bivariate
    }

    fn render(&self, table: &Table, selection: &Selection, options: &RenderOptions) -> PageView {
        analysis_view(self, table, selection, options)
    }
}

impl AnalysisPage for BivariatePage {
    fn default_chart(&self) -> ChartKind {
        ChartKind::ScatterPlot
    }

    fn request(&self, selectors: Selectors) -> ChartRequest {
        ChartRequest::Bivariate {
            first: selectors.first,
            second: selectors.second,
            chart: selectors.chart,
        }
    }
}

impl Page for MultivariatePage {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Multivariate
    }

    fn render(&self, table: &Table, selection: &Selection, options: &RenderOptions) -> PageView {
        analysis_view(self, table, selection, options)
    }
}

impl AnalysisPage for MultivariatePage {
    fn default_chart(&self) -> ChartKind {
        ChartKind::Histogram
    }

    fn request(&self, selectors: Selectors) -> ChartRequest {
        ChartRequest::Multivariate {
            first: selectors.first,
            second: selectors.second,
            color: selectors.color,
            chart: selectors.chart,
        }
    }
}

/// Shared layout of the analysis pages: data preview, then chart or warning
fn analysis_view(
    page: &dyn AnalysisPage,
    table: &Table,
    selection: &Selection,
    options: &RenderOptions,
) -> PageView {
    let mode = page.mode();
    let mut view = PageView::new(mode);
    view.heading("Data Overview");
    view.push(Section::Preview(Preview::head(table, options.preview_rows)));

    view.heading(mode.label());
    let section = match resolve_request(page, table, selection) {
        Ok(request) => {
            view.text(&describe(table, &request));
            chart_section(table, &request, options)
        }
        Err(e) => Section::Warning(e.to_string()),
    };
    view.push(section);
    view
}

fn chart_section(table: &Table, request: &ChartRequest, options: &RenderOptions) -> Section {
    let plan = match select(table, request) {
        Ok(plan) => plan,
        Err(e) => return Section::Warning(e.to_string()),
    };
    match build_figure(table, &plan, options) {
        Ok(figure) => Section::Chart(figure),
        Err(e) => {
            warn!(error = %e, title = %plan.title, "failed to build figure");
            Section::Warning(format!("Could not build chart: {}", e))
        }
    }
}

/// One line summarising the selectors, e.g. `Gender (categorical) | Pie Chart`
fn describe(table: &Table, request: &ChartRequest) -> String {
    let columns: Vec<String> = request
        .columns()
        .into_iter()
        .map(|name| match table.column(name) {
            Some(col) => format!("{} ({})", col.name(), classify(col)),
            None => name.to_string(),
        })
        .collect();
    format!("{} | {}", columns.join(", "), request.chart())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData};

    fn table() -> Table {
        let text = |v: &[&str]| ColumnData::Text(v.iter().map(|s| s.to_string()).collect());
        Table::new(vec![
            Column::new("Invoice ID", text(&["a", "b"])),
            Column::new("Branch", text(&["A", "B"])),
            Column::new("Total", ColumnData::Number(vec![10.0, 20.0])),
            Column::new("Time", text(&["10:00", "11:00"])),
            Column::new("Rating", ColumnData::Number(vec![5.0, 6.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_offered_columns_per_mode() {
        let table = table();
        assert_eq!(offered_columns(&table, AnalysisMode::Univariate), vec!["Branch", "Total", "Rating"]);
        assert_eq!(
            offered_columns(&table, AnalysisMode::Bivariate),
            vec!["Branch", "Total", "Time", "Rating"]
        );
    }

    #[test]
    fn test_defaults_fill_missing_selection() {
        let table = table();
        let request = resolve_request(&BivariatePage, &table, &Selection::default()).unwrap();
        assert_eq!(
            request,
            ChartRequest::Bivariate {
                first: "Branch".to_string(),
                second: "Branch".to_string(),
                chart: ChartKind::ScatterPlot,
            }
        );
    }

    #[test]
    fn test_unknown_chart_name() {
        let selection = Selection {
            chart: Some("Radar".to_string()),
            ..Selection::default()
        };
        let err = resolve_request(&UnivariatePage, &table(), &selection).unwrap_err();
        assert_eq!(err, SelectionError::UnknownChart("Radar".to_string()));
    }

    #[test]
    fn test_default_chart_is_first_offered() {
        let pages: [&dyn AnalysisPage; 3] = [&UnivariatePage, &BivariatePage, &MultivariatePage];
        for page in pages {
            assert_eq!(Some(&page.default_chart()), page.mode().chart_kinds().first());
        }
    }

    #[test]
    fn test_no_offered_columns() {
        let table = Table::new(vec![Column::new(
            "Invoice ID",
            ColumnData::Text(vec!["750-67-8428".to_string()]),
        )])
        .unwrap();
        let err = resolve_request(&UnivariatePage, &table, &Selection::default()).unwrap_err();
        assert_eq!(err, SelectionError::NoColumns(AnalysisMode::Univariate));
        assert_eq!(err.to_string(), "Uni-variate Analysis has no selectable columns.");
    }

    #[test]
    fn test_home_page_is_static() {
        let view = page_for(AnalysisMode::Home).render(&table(), &Selection::default(), &RenderOptions::default());
        assert_eq!(view.figures().count(), 0);
        assert_eq!(view.warnings().count(), 0);
        assert!(view.sections.iter().any(|s| matches!(s, Section::Preview(p) if p.rows.len() == 2)));
    }

    #[test]
    fn test_univariate_page_draws_chart() {
        let selection = Selection {
            first: Some("Branch".to_string()),
            chart: Some("Pie Chart".to_string()),
            ..Selection::default()
        };
        let view = page_for(AnalysisMode::Univariate).render(&table(), &selection, &RenderOptions::default());
        let figure = view.figures().next().unwrap();
        assert_eq!(figure.title, "Branch Distribution");
        assert!(view.sections.contains(&Section::Text("Branch (categorical) | Pie Chart".to_string())));
    }

    #[test]
    fn test_rejection_becomes_warning() {
        let selection = Selection {
            first: Some("Branch".to_string()),
            chart: Some("box".to_string()),
            ..Selection::default()
        };
        let view = page_for(AnalysisMode::Univariate).render(&table(), &selection, &RenderOptions::default());
        assert_eq!(view.figures().count(), 0);
        assert_eq!(
            view.warnings().collect::<Vec<_>>(),
            vec!["Box plot is only applicable for numerical data."]
        );
        // the preview is still shown
        assert!(view.sections.iter().any(|s| matches!(s, Section::Preview(_))));
    }
}
