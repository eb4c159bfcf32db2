//! Structural validation of provider tables and list documents.
//!
//! Validation runs on generic JSON values so that a patch which breaks the
//! shape of a provider (a string `chainId`, a missing `chains` array, a
//! negative priority) is reported as a violation at its exact location rather
//! than as an opaque deserialization error. Every check runs; callers get the
//! complete list of findings in one pass.

use std::{collections::HashSet, fmt};

use jsonschema::Validator;
use once_cell::sync::Lazy;
use rpcl_types::{ListDocument, ProviderTable};
use rpcl_util::{check_name, is_absolute_uri};
use serde_json::{Map, Value};

use crate::error::{ValidationError, Violation};

const PROVIDER_FIELDS: &[&str] = &["name", "logo", "priority", "chains"];
const CHAIN_FIELDS: &[&str] = &["chainId", "endpoints"];

const SCHEMA_KEYWORDS: &[&str] = &[
    "additionalProperties",
    "const",
    "dependentRequired",
    "dependentSchemas",
    "enum",
    "format",
    "maxLength",
    "minLength",
    "minimum",
    "not",
    "oneOf",
    "pattern",
    "required",
    "type",
];

static LIST_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema: Value = serde_json::from_str(include_str!("schema.json")).expect("list schema should be valid JSON");
    jsonschema::options()
        .should_validate_formats(true)
        .build(&schema)
        .expect("list schema should compile")
});

/// Collects every violation in a provider table value.
pub fn collect_table_violations(table: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    collect_table_violations_at(table, "", &mut violations);
    violations
}

/// Validates a provider table value and converts it into its typed form.
pub fn validate_table(table: Value) -> Result<ProviderTable, ValidationError> {
    let violations = collect_table_violations(&table);
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }
    serde_json::from_value(table).map_err(|error| ValidationError::new(vec![Violation::new("", "table_shape", error.to_string())]))
}

/// Validates an already typed provider table.
pub fn validate_providers(table: &ProviderTable) -> Result<(), ValidationError> {
    let value = serde_json::to_value(table).map_err(|error| ValidationError::new(vec![Violation::new("", "table_shape", error.to_string())]))?;
    let violations = collect_table_violations(&value);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

fn collect_table_violations_at(table: &Value, base: &str, violations: &mut Vec<Violation>) {
    let Value::Object(providers) = table else {
        violations.push(Violation::new(base, "table_type", "provider table must be an object"));
        return;
    };
    for (key, provider) in providers {
        collect_provider_violations(provider, &join(base, key), violations);
    }
}

fn collect_provider_violations(provider: &Value, at: &str, violations: &mut Vec<Violation>) {
    let Value::Object(fields) = provider else {
        violations.push(Violation::new(at, "provider_type", "provider must be an object"));
        return;
    };
    collect_unknown_fields(fields, PROVIDER_FIELDS, at, "provider_unknown_field", violations);

    let name_at = join(at, "name");
    match fields.get("name") {
        None => violations.push(Violation::new(&name_at, "provider_name", "provider name is required")),
        Some(Value::String(name)) => {
            if let Err(problem) = check_name(name) {
                violations.push(Violation::new(&name_at, "provider_name", problem.describe()));
            }
        }
        Some(_) => violations.push(Violation::new(&name_at, "provider_name", "provider name must be a string")),
    }

    if let Some(logo) = fields.get("logo") {
        check_uri_field(logo, &join(at, "logo"), "provider_logo", violations);
    }

    if let Some(priority) = fields.get("priority")
        && priority.as_u64().is_none()
    {
        violations.push(Violation::new(
            join(at, "priority"),
            "provider_priority",
            format!("priority must be a non-negative integer, found {priority}"),
        ));
    }

    let chains_at = join(at, "chains");
    match fields.get("chains") {
        None => violations.push(Violation::new(&chains_at, "provider_chains", "provider chains are required")),
        Some(Value::Array(chains)) => {
            for (index, chain) in chains.iter().enumerate() {
                collect_chain_violations(chain, &join(&chains_at, index), violations);
            }
        }
        Some(_) => violations.push(Violation::new(&chains_at, "provider_chains", "provider chains must be an array")),
    }
}

fn collect_chain_violations(chain: &Value, at: &str, violations: &mut Vec<Violation>) {
    let Value::Object(fields) = chain else {
        violations.push(Violation::new(at, "chain_type", "chain entry must be an object"));
        return;
    };
    collect_unknown_fields(fields, CHAIN_FIELDS, at, "chain_unknown_field", violations);

    match fields.get("chainId").map(Value::as_u64) {
        Some(Some(chain_id)) if chain_id >= 1 => {}
        Some(_) => violations.push(Violation::new(
            join(at, "chainId"),
            "chain_id",
            "chainId must be a positive integer",
        )),
        None => violations.push(Violation::new(join(at, "chainId"), "chain_id", "chainId is required")),
    }

    let endpoints_at = join(at, "endpoints");
    let endpoints = match fields.get("endpoints") {
        Some(Value::Array(endpoints)) => endpoints,
        Some(_) => {
            violations.push(Violation::new(&endpoints_at, "endpoints_type", "endpoints must be an array"));
            return;
        }
        None => {
            violations.push(Violation::new(&endpoints_at, "endpoints_empty", "endpoints are required"));
            return;
        }
    };
    if endpoints.is_empty() {
        violations.push(Violation::new(&endpoints_at, "endpoints_empty", "endpoints must not be empty"));
    }

    let mut seen = HashSet::new();
    for (index, endpoint) in endpoints.iter().enumerate() {
        let endpoint_at = join(&endpoints_at, index);
        let Value::String(uri) = endpoint else {
            violations.push(Violation::new(&endpoint_at, "endpoint_uri", "endpoint must be a string"));
            continue;
        };
        if !is_absolute_uri(uri) {
            violations.push(Violation::new(&endpoint_at, "endpoint_uri", format!("endpoint '{uri}' is not an absolute URI")));
        }
        if !seen.insert(uri.as_str()) {
            violations.push(Violation::new(&endpoint_at, "endpoint_duplicate", format!("duplicate endpoint '{uri}'")));
        }
    }
}

fn collect_unknown_fields(fields: &Map<String, Value>, allowed: &[&str], at: &str, rule: &'static str, violations: &mut Vec<Violation>) {
    for key in fields.keys().filter(|key| !allowed.contains(&key.as_str())) {
        violations.push(Violation::new(join(at, key), rule, format!("unknown field '{key}'")));
    }
}

/// Appends one escaped reference token to a JSON Pointer.
fn join(at: &str, token: impl fmt::Display) -> String {
    format!("{at}/{}", token.to_string().replace('~', "~0").replace('/', "~1"))
}

fn check_uri_field(value: &Value, at: &str, rule: &'static str, violations: &mut Vec<Violation>) {
    match value {
        Value::String(uri) if is_absolute_uri(uri) => {}
        Value::String(uri) => violations.push(Violation::new(at, rule, format!("'{uri}' is not an absolute URI"))),
        _ => violations.push(Violation::new(at, rule, "must be a URI string")),
    }
}

/// Precondition checks for a raw list document, run before it is parsed.
///
/// The document is checked against the embedded provider-list schema: the
/// list-level fields, the exclusive `providers` vs `extends`/`changes`
/// shape, the `extends` reference and the shape of each change. A direct
/// list's provider table then goes through the same checks as a patched
/// table, under `/providers`.
pub fn check_document(document: &Value) -> Vec<Violation> {
    let mut violations: Vec<Violation> = LIST_SCHEMA
        .iter_errors(document)
        .map(|error| {
            let rule = schema_rule(&error.schema_path.to_string());
            Violation::new(error.instance_path.to_string(), rule, error.to_string())
        })
        .collect();
    if let Some(table @ Value::Object(_)) = document.get("providers") {
        collect_table_violations_at(table, "/providers", &mut violations);
    }
    violations
}

/// Innermost schema keyword on `schema_path`, used as the violation rule.
fn schema_rule(schema_path: &str) -> &'static str {
    schema_path
        .rsplit('/')
        .find_map(|segment| SCHEMA_KEYWORDS.iter().find(|keyword| **keyword == segment).copied())
        .unwrap_or("schema")
}

/// Runs [`check_document`] and parses the document when it is clean.
pub fn parse_document(document: Value) -> Result<ListDocument, ValidationError> {
    let violations = check_document(&document);
    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }
    ListDocument::from_value(document).map_err(|error| ValidationError::new(vec![Violation::new("", "document_shape", error.to_string())]))
}
