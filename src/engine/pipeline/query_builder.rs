use serde_json::Value;

use crate::engine::executor::Query;
use crate::engine::types::Params;

use super::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub validate_params: bool,
    pub load_relationships: bool,
    pub optimize_aggregates: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            validate_params: true,
            load_relationships: true,
            optimize_aggregates: true,
        }
    }
}

/// Turns a report plus caller params into an executable query.
pub trait QueryBuilder: Send + Sync {
    fn build(&self, report: &Report, params: &Params, options: BuildOptions)
    -> Result<Query, String>;
}

/// Default builder: filter params become equality filters, group fields
/// lead the sort order so group breaks are contiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportQueryBuilder;

impl QueryBuilder for ReportQueryBuilder {
    fn build(
        &self,
        report: &Report,
        params: &Params,
        options: BuildOptions,
    ) -> Result<Query, String> {
        report.validate()?;

        if options.validate_params {
            for name in &report.required_params {
                match params.get(name) {
                    None | Some(Value::Null) => {
                        return Err(format!("missing required parameter '{name}'"));
                    }
                    Some(_) => {}
                }
            }
        }

        let mut query = Query::new(report.resource.clone());
        for name in &report.filter_params {
            if let Some(value) = params.get(name).filter(|v| !v.is_null()) {
                query.filter.insert(name.clone(), value.clone());
            }
        }

        query.sort = if options.optimize_aggregates {
            group_led_sort(&report.group_fields, &report.sort)
        } else {
            report.sort.clone()
        };

        if options.load_relationships {
            query.relationships = report.relationships.clone();
        }

        Ok(query)
    }
}

fn sort_field(entry: &str) -> &str {
    entry.trim_start_matches('-')
}

/// Group fields must be the leading sort keys, in group order, or a group
/// can come back split. A group field the report already sorts on keeps its
/// direction but moves to the front; its later occurrence is dropped.
fn group_led_sort(group_fields: &[String], sort: &[String]) -> Vec<String> {
    let already_leading = sort.len() >= group_fields.len()
        && group_fields
            .iter()
            .zip(sort)
            .all(|(field, entry)| sort_field(entry) == field);
    if already_leading {
        return sort.to_vec();
    }

    let mut ordered: Vec<String> = group_fields
        .iter()
        .map(|field| {
            sort.iter()
                .find(|entry| sort_field(entry) == field)
                .cloned()
                .unwrap_or_else(|| field.clone())
        })
        .collect();
    ordered.extend(
        sort.iter()
            .filter(|entry| !group_fields.iter().any(|f| f == sort_field(entry)))
            .cloned(),
    );
    ordered
}
