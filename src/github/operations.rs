// GraphQL operation descriptors.
// Validates documents up front and binds variables into executable requests.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::cache::OperationKey;
use crate::error::{QuillError, Result};
use crate::github::types::GraphQLRequest;

/// Operation name of the repository query.
pub const GET_REPOSITORY: &str = "GetRepository";
/// Operation name of the create-issue mutation.
pub const CREATE_ISSUE: &str = "CreateIssue";

const GET_REPOSITORY_DOCUMENT: &str = "\
query GetRepository($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    id
    name
    url
    owner {
      login
      ... on User { name }
      ... on Organization { name }
    }
    issues(first: 30) {
      edges {
        node {
          id
          number
          title
        }
      }
      pageInfo {
        endCursor
        hasNextPage
      }
    }
  }
}";

const CREATE_ISSUE_DOCUMENT: &str = "\
mutation CreateIssue($repositoryId: ID!, $title: String!) {
  createIssue(input: { repositoryId: $repositoryId, title: $title }) {
    issue {
      id
      number
      title
    }
  }
}";

/// A named GraphQL operation: document text plus its variable contract.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    name: String,
    document: String,
    declared: BTreeSet<String>,
    required: BTreeSet<String>,
}

/// An operation bound to concrete variable values, ready to execute.
#[derive(Debug, Clone)]
pub struct BoundOperation {
    pub key: OperationKey,
    pub request: GraphQLRequest,
}

impl OperationDescriptor {
    /// Validates a document and its required-variable contract.
    ///
    /// The document is kept opaque beyond a scan for variable declarations;
    /// full GraphQL validation is the server's job.
    pub fn describe(name: &str, document: &str, required: &[&str]) -> Result<Self> {
        if document.trim().is_empty() {
            return Err(QuillError::Validation(format!(
                "operation {name} has an empty document"
            )));
        }

        let declared = declared_variables(document);
        for var in required {
            if !declared.contains(*var) {
                return Err(QuillError::Validation(format!(
                    "operation {name} does not declare required variable ${var}"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            document: document.to_string(),
            declared,
            required: required.iter().map(|v| v.to_string()).collect(),
        })
    }

    /// The repository query: header fields plus the first page of issues.
    pub fn get_repository() -> Self {
        Self::describe(GET_REPOSITORY, GET_REPOSITORY_DOCUMENT, &["owner", "name"])
            .expect("built-in repository query is well formed")
    }

    /// The create-issue mutation.
    pub fn create_issue() -> Self {
        Self::describe(CREATE_ISSUE, CREATE_ISSUE_DOCUMENT, &["repositoryId", "title"])
            .expect("built-in create-issue mutation is well formed")
    }

    /// Binds variable values, producing the cache key and the wire request.
    ///
    /// Values travel in the request's `variables` object and are never
    /// spliced into the document text.
    pub fn bind(&self, variables: BTreeMap<String, Value>) -> Result<BoundOperation> {
        for var in &self.required {
            if !variables.contains_key(var) {
                return Err(QuillError::Validation(format!(
                    "operation {} is missing required variable ${var}",
                    self.name
                )));
            }
        }
        for var in variables.keys() {
            if !self.declared.contains(var) {
                return Err(QuillError::Validation(format!(
                    "operation {} does not accept variable ${var}",
                    self.name
                )));
            }
        }

        let key = OperationKey::new(&self.name, variables.clone());
        let request = GraphQLRequest {
            query: self.document.clone(),
            variables: Value::Object(variables.into_iter().collect()),
        };
        Ok(BoundOperation { key, request })
    }
}

/// Extracts variable declarations: `$name` immediately followed by `:`.
/// Usage sites like `owner: $owner` do not match.
fn declared_variables(document: &str) -> BTreeSet<String> {
    let mut declared = BTreeSet::new();
    let bytes = document.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            let mut after = end;
            while after < bytes.len() && bytes[after].is_ascii_whitespace() {
                after += 1;
            }
            if end > start && after < bytes.len() && bytes[after] == b':' {
                declared.insert(document[start..end].to_string());
            }
            i = end;
        } else {
            i += 1;
        }
    }
    declared
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_built_in_descriptors_are_valid() {
        assert_eq!(OperationDescriptor::get_repository().name, GET_REPOSITORY);
        assert_eq!(OperationDescriptor::create_issue().name, CREATE_ISSUE);
    }

    #[test]
    fn test_describe_rejects_blank_document() {
        let result = OperationDescriptor::describe("Nothing", "   \n", &[]);
        assert!(matches!(result, Err(QuillError::Validation(_))));
    }

    #[test]
    fn test_describe_rejects_undeclared_required_variable() {
        let result = OperationDescriptor::describe(
            "Viewer",
            "query Viewer { viewer { login } }",
            &["login"],
        );
        assert!(matches!(result, Err(QuillError::Validation(_))));
    }

    #[test]
    fn test_usage_sites_are_not_declarations() {
        // $owner appears only as an argument value, never declared.
        let result = OperationDescriptor::describe(
            "Bad",
            "query Bad { repository(owner: $owner) { id } }",
            &["owner"],
        );
        assert!(matches!(result, Err(QuillError::Validation(_))));
    }

    #[test]
    fn test_bind_missing_required_variable() {
        let descriptor = OperationDescriptor::get_repository();
        let result = descriptor.bind(vars(&[("owner", json!("octocat"))]));
        assert!(matches!(result, Err(QuillError::Validation(_))));
    }

    #[test]
    fn test_bind_rejects_unknown_variable() {
        let descriptor = OperationDescriptor::get_repository();
        let result = descriptor.bind(vars(&[
            ("owner", json!("octocat")),
            ("name", json!("Hello-World")),
            ("extra", json!(1)),
        ]));
        assert!(matches!(result, Err(QuillError::Validation(_))));
    }

    #[test]
    fn test_bind_produces_key_and_request() {
        let descriptor = OperationDescriptor::get_repository();
        let bound = descriptor
            .bind(vars(&[
                ("owner", json!("octocat")),
                ("name", json!("Hello-World")),
            ]))
            .unwrap();

        assert_eq!(bound.key.operation, GET_REPOSITORY);
        assert_eq!(bound.request.variables["owner"], json!("octocat"));
        assert_eq!(bound.request.variables["name"], json!("Hello-World"));
        assert!(bound.request.query.contains("repository(owner: $owner"));
    }

    #[test]
    fn test_variable_values_stay_out_of_the_document() {
        let hostile = "\") { id } } mutation Evil { __typename }";
        let descriptor = OperationDescriptor::create_issue();
        let bound = descriptor
            .bind(vars(&[
                ("repositoryId", json!("R_1")),
                ("title", json!(hostile)),
            ]))
            .unwrap();

        assert!(!bound.request.query.contains(hostile));
        assert_eq!(bound.request.variables["title"], json!(hostile));
    }
}
