//! Compilation of cached features into a flat pickle list.

use itertools::Itertools as _;
use lazy_regex::regex;

use crate::{
    event::emitter::IdGenerator,
    feature::{CachedFeature, FeatureCache},
};

use super::{DataTable, Pickle, PickleArgument, PickleStep, PickleStepType};

/// Flattens every cached feature, in cache insertion order, into pickles.
///
/// Within a feature, children are visited in declaration order and
/// `Examples` rows in table order, so the output order is deterministic.
pub(crate) fn compile_pickles(
    cache: &FeatureCache,
    ids: &IdGenerator,
) -> Vec<Pickle> {
    let mut pickles = Vec::new();
    for (uri, entry) in cache.entries() {
        compile_feature(uri, entry, ids, &mut pickles);
    }
    log::debug!("compiled {} pickle(s)", pickles.len());
    pickles
}

fn compile_feature(
    uri: &str,
    entry: &CachedFeature,
    ids: &IdGenerator,
    out: &mut Vec<Pickle>,
) {
    let feature = &entry.feature;
    let feature_bg: Vec<&gherkin::Step> = feature
        .background
        .iter()
        .flat_map(|bg| bg.steps.iter())
        .collect();

    for scenario in &feature.scenarios {
        compile_scenario(Ctx {
            uri,
            language: &entry.language,
            parent_tags: &feature.tags,
            background: &feature_bg,
            scenario,
            ids,
            out,
        });
    }

    for rule in &feature.rules {
        let rule_tags = merge_tags(&feature.tags, &rule.tags);
        let mut background = feature_bg.clone();
        if let Some(rule_bg) = &rule.background {
            background.extend(rule_bg.steps.iter());
        }
        for scenario in &rule.scenarios {
            compile_scenario(Ctx {
                uri,
                language: &entry.language,
                parent_tags: &rule_tags,
                background: &background,
                scenario,
                ids,
                out,
            });
        }
    }
}

/// Everything needed to compile one scenario into pickles.
struct Ctx<'a> {
    uri: &'a str,
    language: &'a str,
    parent_tags: &'a [String],
    background: &'a [&'a gherkin::Step],
    scenario: &'a gherkin::Scenario,
    ids: &'a IdGenerator,
    out: &'a mut Vec<Pickle>,
}

fn compile_scenario(ctx: Ctx<'_>) {
    let scenario = ctx.scenario;
    let scenario_node = node_id(ctx.uri, scenario.position);
    let tags = merge_tags(ctx.parent_tags, &scenario.tags);

    if scenario.examples.is_empty() {
        if ctx.background.is_empty() && scenario.steps.is_empty() {
            return;
        }
        let steps = compile_steps(&ctx, None, None);
        ctx.out.push(Pickle {
            id: ctx.ids.next("pickle"),
            uri: ctx.uri.to_owned(),
            name: scenario.name.clone(),
            language: ctx.language.to_owned(),
            steps,
            tags,
            ast_node_ids: vec![scenario_node],
        });
        return;
    }

    for examples in &scenario.examples {
        let Some(table) = examples.table.as_ref() else {
            continue;
        };
        let Some((header, body)) = table.rows.split_first() else {
            continue;
        };

        let tags = merge_tags(&tags, &examples.tags);
        for (row_idx, row) in body.iter().enumerate() {
            let row_node = format!(
                "{}:{}",
                node_id(ctx.uri, examples.position),
                row_idx + 1,
            );
            let vars: Vec<(&str, &str)> = header
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect();

            let name = format!(
                "{} ({})",
                scenario.name,
                vars.iter().map(|(h, v)| format!("{h}={v}")).join(", "),
            );
            let steps = compile_steps(&ctx, Some(&vars), Some(&row_node));
            ctx.out.push(Pickle {
                id: ctx.ids.next("pickle"),
                uri: ctx.uri.to_owned(),
                name,
                language: ctx.language.to_owned(),
                steps,
                tags: tags.clone(),
                ast_node_ids: vec![scenario_node.clone(), row_node],
            });
        }
    }
}

fn compile_steps(
    ctx: &Ctx<'_>,
    vars: Option<&[(&str, &str)]>,
    row_node: Option<&str>,
) -> Vec<PickleStep> {
    let mut carry = None;
    ctx.background
        .iter()
        .copied()
        .chain(ctx.scenario.steps.iter())
        .map(|step| {
            let ty = step_type(&step.keyword, &mut carry);
            let mut ast_node_ids = vec![node_id(ctx.uri, step.position)];
            if let Some(row) = row_node {
                ast_node_ids.push(row.to_owned());
            }
            PickleStep {
                id: ctx.ids.next("step"),
                text: interpolate(&step.value, vars),
                ty,
                argument: step_argument(step, vars),
                ast_node_ids,
            }
        })
        .collect()
}

fn step_argument(
    step: &gherkin::Step,
    vars: Option<&[(&str, &str)]>,
) -> Option<PickleArgument> {
    if let Some(docstring) = &step.docstring {
        return Some(PickleArgument::DocString {
            content: interpolate(docstring, vars),
        });
    }
    step.table.as_ref().map(|table| {
        PickleArgument::DataTable(DataTable::new(
            table
                .rows
                .iter()
                .map(|row| {
                    row.iter().map(|cell| interpolate(cell, vars)).collect()
                })
                .collect(),
        ))
    })
}

/// Derives a step type from its keyword, carrying the previous typed
/// keyword forward through conjunctions.
fn step_type(
    keyword: &str,
    carry: &mut Option<PickleStepType>,
) -> PickleStepType {
    match keyword.trim() {
        "Given" => {
            *carry = Some(PickleStepType::Context);
            PickleStepType::Context
        }
        "When" => {
            *carry = Some(PickleStepType::Action);
            PickleStepType::Action
        }
        "Then" => {
            *carry = Some(PickleStepType::Outcome);
            PickleStepType::Outcome
        }
        "And" | "But" | "*" => carry.unwrap_or(PickleStepType::Unknown),
        _ => PickleStepType::Unknown,
    }
}

/// Replaces `<header>` tokens with the example row's values. Unknown
/// headers are left in place.
fn interpolate(text: &str, vars: Option<&[(&str, &str)]>) -> String {
    let Some(vars) = vars else {
        return text.to_owned();
    };
    regex!(r"<([^<>\s]+)>")
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            vars.iter()
                .find_map(|(k, v)| (*k == name).then(|| (*v).to_owned()))
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

fn merge_tags(parent: &[String], own: &[String]) -> Vec<String> {
    let mut tags = parent.to_vec();
    for tag in own {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

fn node_id(uri: &str, pos: gherkin::LineCol) -> String {
    format!("{uri}:{}:{}", pos.line, pos.col)
}
