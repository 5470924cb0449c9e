//! Output formatting for explanations and configurations.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use docgraph_core::GraphConfig;
use docgraph_proto::ElementKind;
use serde_json::json;

use crate::explain::{Explanation, ScanExplanation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII tables
    Table,
    /// Pretty-printed JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub fn format_explanation(explanation: &Explanation, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => explanation_table(explanation),
        OutputFormat::Json => pretty(&explanation_json(explanation)),
    }
}

pub fn format_config(config: &GraphConfig, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => config_table(config),
        OutputFormat::Json => pretty(&json!({
            "config": config,
            "physical_collections": {
                "vertices": physical(config, ElementKind::Vertex),
                "edges": physical(config, ElementKind::Edge),
            },
        })),
    }
}

fn explanation_table(explanation: &Explanation) -> String {
    let mut steps = Table::new();
    steps.set_header(vec!["#", "Step"]);
    for (i, step) in explanation.steps.iter().enumerate() {
        steps.add_row(vec![Cell::new(i), Cell::new(step)]);
    }

    let mut output = format!("Steps\n{}", steps);
    let Some(scan) = &explanation.scan else {
        output.push_str("\n\nNo leading selection; nothing is pushed down");
        return output;
    };

    let Some(query) = &scan.query else {
        output.push_str("\n\nNo eligible collections; nothing is queried");
        return output;
    };
    output.push_str(&format!("\n\nQuery ({})\n{}", scan.kind, query.text));
    if !query.bind_vars.is_empty() {
        output.push_str(&format!("\n\nBind variables\n{}", pretty(&json!(query.bind_vars))));
    }

    if !scan.predicates.is_empty() {
        let mut predicates = Table::new();
        predicates.set_header(vec!["Predicate", "Pushed filter", "Support"]);
        for planned in &scan.predicates {
            predicates.add_row(vec![
                Cell::new(&planned.container),
                Cell::new(&planned.filter),
                Cell::new(planned.support),
            ]);
        }
        output.push_str(&format!("\n\nPredicates\n{}", predicates));
    }
    output.push_str(&format!("\n\nOverall support: {}", scan.support));
    output
}

fn explanation_json(explanation: &Explanation) -> serde_json::Value {
    json!({
        "steps": explanation.steps,
        "rendered_steps": explanation.steps.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "scan": explanation.scan.as_ref().map(scan_json),
    })
}

fn scan_json(scan: &ScanExplanation) -> serde_json::Value {
    let predicates: Vec<serde_json::Value> = scan
        .predicates
        .iter()
        .map(|planned| {
            json!({
                "predicate": planned.container,
                "filter": planned.filter.render("x"),
                "support": planned.support,
            })
        })
        .collect();
    json!({
        "kind": scan.kind,
        "ids": scan.ids,
        "collections": scan.collections,
        "query": scan.query,
        "support": scan.support,
        "predicates": predicates,
    })
}

fn config_table(config: &GraphConfig) -> String {
    let mut settings = Table::new();
    settings.set_header(vec!["Setting", "Value"]);
    for (name, value) in [
        ("db_name", config.db_name.clone()),
        ("graph_name", config.graph_name.clone()),
        ("graph_type", format!("{:?}", config.graph_type)),
        ("label_field", config.label_field.clone()),
        (
            "enable_data_definition",
            config.enable_data_definition.to_string(),
        ),
    ] {
        settings.add_row(vec![name.to_string(), value]);
    }

    let mut collections = Table::new();
    collections.set_header(vec!["Kind", "Collection", "Physical"]);
    for kind in [ElementKind::Vertex, ElementKind::Edge] {
        for (name, physical) in config
            .collections(kind)
            .iter()
            .zip(physical(config, kind))
        {
            collections.add_row(vec![kind.to_string(), name.clone(), physical]);
        }
    }

    let mut output = format!("{}\n\n{}", settings, collections);
    if !config.edge_definitions.is_empty() {
        let mut definitions = Table::new();
        definitions.set_header(vec!["Edge", "From", "To"]);
        for def in &config.edge_definitions {
            definitions.add_row(vec![
                def.collection.clone(),
                join(&def.from),
                join(&def.to),
            ]);
        }
        output.push_str(&format!("\n\n{}", definitions));
    }
    output
}

fn physical(config: &GraphConfig, kind: ElementKind) -> Vec<String> {
    config
        .collections(kind)
        .iter()
        .map(|name| config.physical_collection(name))
        .collect()
}

fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
