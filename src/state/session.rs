// Repository session state machine.
// Drives one fetch-then-render cycle and one mutate-then-reconcile cycle
// against the response cache.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::cache::{OperationKey, ResponseCache};
use crate::error::{QuillError, Result};
use crate::github::Transport;
use crate::github::operations::{BoundOperation, OperationDescriptor};
use crate::github::types::{CreateIssueData, GraphQLError, GraphQLResponse, Issue, Repository};

/// A repository path of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPath {
    pub owner: String,
    pub name: String,
}

impl RepoPath {
    /// Split on the first `/`. Both halves must be non-empty.
    pub fn parse(input: &str) -> Result<Self> {
        let (owner, name) = input
            .split_once('/')
            .ok_or_else(|| QuillError::InvalidPath(input.to_string()))?;
        if owner.is_empty() || name.is_empty() {
            return Err(QuillError::InvalidPath(input.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Why a fetch settled without a usable repository.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// The request itself failed: network, HTTP status, undecodable body.
    Transport(String),
    /// The server answered with errors in the envelope.
    Graphql(Vec<GraphQLError>),
    /// The query resolved but no such repository exists.
    NotFound,
    /// A response with neither errors nor a repository field.
    EmptyPayload,
    /// A repository object that does not decode.
    Malformed(String),
}

impl FetchFailure {
    /// Human-readable description for the error view.
    pub fn describe(&self) -> String {
        match self {
            FetchFailure::Transport(message) => format!("Request failed: {message}"),
            FetchFailure::Graphql(errors) => {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                format!("GitHub returned errors: {}", messages.join("; "))
            }
            FetchFailure::NotFound => "Repository not found".to_string(),
            FetchFailure::EmptyPayload => "GitHub returned an empty response".to_string(),
            FetchFailure::Malformed(message) => {
                format!("Could not read the repository payload: {message}")
            }
        }
    }
}

/// Session lifecycle phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Fetching,
    Ready,
    FetchFailed(FetchFailure),
    Mutating,
    MutationFailed(Vec<GraphQLError>),
}

impl SessionPhase {
    /// Short label for logs and the status line.
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Fetching => "fetching",
            SessionPhase::Ready => "ready",
            SessionPhase::FetchFailed(_) => "fetch failed",
            SessionPhase::Mutating => "creating issue",
            SessionPhase::MutationFailed(_) => "issue creation failed",
        }
    }

    /// Whether a request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Fetching | SessionPhase::Mutating)
    }
}

/// Settled result of a fetch, tagged with the path it was issued for.
#[derive(Debug)]
pub struct FetchOutcome {
    target: RepoPath,
    key: OperationKey,
    result: Result<GraphQLResponse>,
}

/// Settled result of a create-issue call.
#[derive(Debug)]
pub struct MutationOutcome {
    result: Result<GraphQLResponse>,
}

/// An admitted fetch, ready to execute on a background task.
pub struct PendingFetch {
    transport: Arc<dyn Transport>,
    target: RepoPath,
    bound: BoundOperation,
}

impl PendingFetch {
    /// Execute the transport call. Hand the outcome back to `apply_fetch`.
    pub async fn run(self) -> FetchOutcome {
        let result = self.transport.execute(self.bound.request).await;
        FetchOutcome {
            target: self.target,
            key: self.bound.key,
            result,
        }
    }
}

/// An admitted create-issue call, ready to execute on a background task.
pub struct PendingMutation {
    transport: Arc<dyn Transport>,
    bound: BoundOperation,
}

impl PendingMutation {
    /// Execute the transport call. Hand the outcome back to `apply_create_issue`.
    pub async fn run(self) -> MutationOutcome {
        let result = self.transport.execute(self.bound.request).await;
        MutationOutcome { result }
    }
}

/// Single-repository session owning the cache and the view of one repo.
///
/// At most one fetch target and one mutation are of interest at a time:
/// a newer fetch supersedes the pending one, and mutations are admitted
/// only from a `Ready` session.
pub struct RepoSession {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    repository_query: OperationDescriptor,
    issue_mutation: OperationDescriptor,
    /// Path text as typed; parsed only when a fetch is admitted.
    path: String,
    phase: SessionPhase,
    /// Target of the most recently issued fetch. Outcomes for any other
    /// target are stale and get discarded.
    pending_target: Option<RepoPath>,
    /// Key of the fetch the current view was decoded from.
    current_key: Option<OperationKey>,
    repository: Option<Repository>,
    /// Bumped on every phase transition so observers can poll cheaply.
    revision: u64,
}

impl RepoSession {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: ResponseCache::new(),
            repository_query: OperationDescriptor::get_repository(),
            issue_mutation: OperationDescriptor::create_issue(),
            path: String::new(),
            phase: SessionPhase::default(),
            pending_target: None,
            current_key: None,
            repository: None,
            revision: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn repository(&self) -> Option<&Repository> {
        self.repository.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// When the entry behind the current view was last written.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        let key = self.current_key.as_ref()?;
        Some(self.cache.read(key)?.cached_at)
    }

    /// Update the path text. Pure state: never touches transport or cache.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Admit a fetch for the current path.
    ///
    /// Fails fast on an unparseable path and while a mutation cycle is
    /// unfinished; no transport call happens in either case. Admitting a
    /// fetch while one is in flight supersedes the older target.
    pub fn fetch(&mut self) -> Result<PendingFetch> {
        if matches!(
            self.phase,
            SessionPhase::Mutating | SessionPhase::MutationFailed(_)
        ) {
            return Err(QuillError::InvalidState(
                "a mutation cycle is still in progress".to_string(),
            ));
        }

        let target = RepoPath::parse(&self.path)?;

        let mut variables = BTreeMap::new();
        variables.insert("owner".to_string(), json!(target.owner));
        variables.insert("name".to_string(), json!(target.name));
        let bound = self.repository_query.bind(variables)?;

        tracing::info!(path = %target, "fetching repository");
        self.pending_target = Some(target.clone());
        self.set_phase(SessionPhase::Fetching);

        Ok(PendingFetch {
            transport: Arc::clone(&self.transport),
            target,
            bound,
        })
    }

    /// Apply a settled fetch outcome.
    ///
    /// Returns false when the outcome belongs to a superseded target and
    /// was discarded without touching cache or state. An applied outcome
    /// is written to the cache whether it succeeded or not.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> bool {
        if self.pending_target.as_ref() != Some(&outcome.target) {
            tracing::debug!(path = %outcome.target, "discarding superseded fetch outcome");
            return false;
        }
        self.pending_target = None;

        let FetchOutcome { target, key, result } = outcome;
        self.current_key = Some(key.clone());
        self.repository = None;

        let phase = match result {
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(path = %target, error = %message, "fetch failed");
                self.cache.write(
                    key,
                    None,
                    Some(vec![GraphQLError::from_message(message.as_str())]),
                );
                SessionPhase::FetchFailed(FetchFailure::Transport(message))
            }
            Ok(response) => {
                let GraphQLResponse { data, errors } = response;
                self.cache.write(key, data.clone(), errors.clone());

                if let Some(errors) = errors.filter(|e| !e.is_empty()) {
                    SessionPhase::FetchFailed(FetchFailure::Graphql(errors))
                } else {
                    match decode_repository(data.as_ref()) {
                        DecodedRepository::Ready(repository) => {
                            tracing::info!(
                                path = %target,
                                issues = repository.issues.edges.len(),
                                "repository loaded"
                            );
                            self.repository = Some(repository);
                            SessionPhase::Ready
                        }
                        DecodedRepository::NotFound => {
                            SessionPhase::FetchFailed(FetchFailure::NotFound)
                        }
                        DecodedRepository::Empty => {
                            SessionPhase::FetchFailed(FetchFailure::EmptyPayload)
                        }
                        DecodedRepository::Malformed(message) => {
                            SessionPhase::FetchFailed(FetchFailure::Malformed(message))
                        }
                    }
                }
            }
        };

        self.set_phase(phase);
        true
    }

    /// Admit a create-issue mutation for the loaded repository.
    ///
    /// Requires a `Ready` session (the repository id anchors the mutation)
    /// and a non-blank title; neither failure reaches the transport.
    pub fn create_issue(&mut self, title: &str) -> Result<PendingMutation> {
        let repository = match (&self.phase, &self.repository) {
            (SessionPhase::Ready, Some(repository)) => repository,
            _ => {
                return Err(QuillError::InvalidState(
                    "no repository is loaded".to_string(),
                ));
            }
        };
        if title.trim().is_empty() {
            return Err(QuillError::Validation(
                "issue title must not be empty".to_string(),
            ));
        }

        let mut variables = BTreeMap::new();
        variables.insert("repositoryId".to_string(), json!(repository.id));
        variables.insert("title".to_string(), json!(title));
        let bound = self.issue_mutation.bind(variables)?;

        tracing::info!(repository = %repository.name, "creating issue");
        self.set_phase(SessionPhase::Mutating);

        Ok(PendingMutation {
            transport: Arc::clone(&self.transport),
            bound,
        })
    }

    /// Apply a settled mutation outcome.
    ///
    /// Success patches the created issue into the cached connection and
    /// returns to `Ready`. Any failure keeps the loaded repository and the
    /// cache untouched; the errors wait in `MutationFailed` until
    /// acknowledged.
    pub fn apply_create_issue(&mut self, outcome: MutationOutcome) {
        if !matches!(self.phase, SessionPhase::Mutating) {
            tracing::debug!("ignoring mutation outcome outside a mutation cycle");
            return;
        }

        let errors = match outcome.result {
            Ok(response) => match response.errors.filter(|e| !e.is_empty()) {
                Some(errors) => errors,
                None => match extract_created_issue(response.data) {
                    Some(issue) => match self.append_issue(issue) {
                        Ok(()) => {
                            self.set_phase(SessionPhase::Ready);
                            return;
                        }
                        Err(err) => vec![GraphQLError::from_message(err.to_string())],
                    },
                    None => vec![GraphQLError::from_message(
                        "create-issue response carried no issue",
                    )],
                },
            },
            Err(err) => vec![GraphQLError::from_message(err.to_string())],
        };

        tracing::warn!(count = errors.len(), "issue creation failed");
        self.set_phase(SessionPhase::MutationFailed(errors));
    }

    /// Acknowledge a failed mutation, returning to the loaded repository.
    pub fn dismiss_mutation_error(&mut self) {
        if matches!(self.phase, SessionPhase::MutationFailed(_)) {
            self.set_phase(SessionPhase::Ready);
        }
    }

    /// Append a created issue to the cached connection, then refresh the
    /// view from the reconciled entry.
    fn append_issue(&mut self, issue: Issue) -> Result<()> {
        let key = self.current_key.clone().ok_or(QuillError::CacheMiss)?;
        let node = serde_json::to_value(&issue)?;

        self.cache.patch(&key, |mut data| {
            push_issue_edge(&mut data, json!({ "node": node }));
            data
        })?;

        if let Some(entry) = self.cache.read(&key) {
            if let DecodedRepository::Ready(repository) = decode_repository(entry.data.as_ref()) {
                self.repository = Some(repository);
            }
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        tracing::debug!(from = self.phase.label(), to = phase.label(), "transition");
        self.phase = phase;
        self.revision += 1;
    }
}

enum DecodedRepository {
    Ready(Repository),
    NotFound,
    Empty,
    Malformed(String),
}

/// Classify the `data` half of a repository response.
///
/// A missing `repository` field is an empty payload; an explicit null is
/// the server saying the repository does not exist.
fn decode_repository(data: Option<&Value>) -> DecodedRepository {
    let Some(node) = data.and_then(|d| d.get("repository")) else {
        return DecodedRepository::Empty;
    };
    if node.is_null() {
        return DecodedRepository::NotFound;
    }
    match serde_json::from_value::<Repository>(node.clone()) {
        Ok(repository) => DecodedRepository::Ready(repository),
        Err(err) => DecodedRepository::Malformed(err.to_string()),
    }
}

fn extract_created_issue(data: Option<Value>) -> Option<Issue> {
    let payload: CreateIssueData = serde_json::from_value(data?).ok()?;
    payload.create_issue?.issue
}

/// Push a created issue edge into a cached repository payload.
///
/// A fetched selection may omit the connection entirely; the missing
/// `issues`/`edges` levels are created so the appended edge is never lost.
fn push_issue_edge(data: &mut Value, edge: Value) {
    let Some(repository) = data.get_mut("repository").and_then(Value::as_object_mut) else {
        return;
    };
    let issues = repository.entry("issues").or_insert_with(|| json!({}));
    if !issues.is_object() {
        *issues = json!({});
    }
    let Some(issues) = issues.as_object_mut() else {
        return;
    };
    let edges = issues.entry("edges").or_insert_with(|| json!([]));
    if !edges.is_array() {
        *edges = json!([]);
    }
    if let Some(edges) = edges.as_array_mut() {
        edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::GraphQLRequest;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport double driven by a queue of scripted results.
    struct FakeTransport {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<GraphQLResponse>>>,
    }

    impl FakeTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                script: Mutex::new(VecDeque::new()),
            })
        }

        fn push_ok(&self, envelope: Value) {
            let response: GraphQLResponse = serde_json::from_value(envelope).unwrap();
            self.script.lock().unwrap().push_back(Ok(response));
        }

        fn push_err(&self, message: &str) {
            self.script
                .lock()
                .unwrap()
                .push_back(Err(QuillError::Other(message.to_string())));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, _request: GraphQLRequest) -> Result<GraphQLResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted transport call")
        }
    }

    fn repo_envelope(name: &str, issues: &[(u64, &str)]) -> Value {
        let edges: Vec<Value> = issues
            .iter()
            .map(|(number, title)| {
                json!({
                    "node": { "id": format!("I_{number}"), "number": number, "title": title }
                })
            })
            .collect();
        json!({
            "data": {
                "repository": {
                    "id": "R_1",
                    "name": name,
                    "url": format!("https://github.com/octocat/{name}"),
                    "owner": { "login": "octocat", "name": "The Octocat" },
                    "issues": {
                        "edges": edges,
                        "pageInfo": { "endCursor": null, "hasNextPage": false }
                    }
                }
            }
        })
    }

    fn created_issue_envelope(number: u64, title: &str) -> Value {
        json!({
            "data": {
                "createIssue": {
                    "issue": { "id": format!("I_{number}"), "number": number, "title": title }
                }
            }
        })
    }

    fn repo_key(owner: &str, name: &str) -> OperationKey {
        let mut variables = BTreeMap::new();
        variables.insert("owner".to_string(), json!(owner));
        variables.insert("name".to_string(), json!(name));
        OperationKey::new("GetRepository", variables)
    }

    async fn fetch_and_apply(session: &mut RepoSession) -> bool {
        let pending = session.fetch().unwrap();
        let outcome = pending.run().await;
        session.apply_fetch(outcome)
    }

    #[test]
    fn test_path_splits_on_first_slash() {
        let path = RepoPath::parse("octocat/Hello-World").unwrap();
        assert_eq!(path.owner, "octocat");
        assert_eq!(path.name, "Hello-World");

        let nested = RepoPath::parse("a/b/c").unwrap();
        assert_eq!(nested.owner, "a");
        assert_eq!(nested.name, "b/c");
        assert_eq!(nested.to_string(), "a/b/c");
    }

    #[test]
    fn test_path_rejects_missing_halves() {
        for bad in ["", "nopath", "/repo", "owner/"] {
            assert!(
                matches!(RepoPath::parse(bad), Err(QuillError::InvalidPath(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_success_with_empty_issue_list() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        assert_eq!(*session.phase(), SessionPhase::Ready);
        let repository = session.repository().unwrap();
        assert_eq!(repository.name, "Hello-World");
        assert!(repository.issues.edges.is_empty());
        assert_eq!(transport.calls(), 1);

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        assert!(entry.data.is_some());
        assert!(entry.errors.is_none());
    }

    #[tokio::test]
    async fn test_refetch_same_path_caches_identical_data() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);
        let first = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap()
            .data;

        assert!(fetch_and_apply(&mut session).await);
        let second = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap()
            .data;

        assert_eq!(first, second);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_sparse_repository_payload_is_ready() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({
            "data": {
                "repository": {
                    "id": "R1",
                    "name": "Hello-World",
                    "url": "https://github.com/octocat/Hello-World",
                    "issues": { "edges": [] }
                }
            }
        }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        assert_eq!(*session.phase(), SessionPhase::Ready);
        let repository = session.repository().unwrap();
        assert!(repository.owner.login.is_empty());
        assert!(repository.issues.edges.is_empty());
    }

    #[tokio::test]
    async fn test_null_repository_is_not_found() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({ "data": { "repository": null } }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/definitely-missing");
        assert!(fetch_and_apply(&mut session).await);

        assert_eq!(
            *session.phase(),
            SessionPhase::FetchFailed(FetchFailure::NotFound)
        );
        assert!(session.repository().is_none());

        // The miss is still recorded in the cache.
        let entry = session
            .cache
            .read(&repo_key("octocat", "definitely-missing"))
            .unwrap();
        assert_eq!(entry.data, Some(json!({ "repository": null })));
    }

    #[test]
    fn test_invalid_path_fails_before_transport() {
        let transport = FakeTransport::new();
        let mut session = RepoSession::new(transport.clone());

        session.set_path("badpath");
        let result = session.fetch();

        assert!(matches!(result, Err(QuillError::InvalidPath(_))));
        assert_eq!(*session.phase(), SessionPhase::Idle);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_cached_and_surfaced() {
        let transport = FakeTransport::new();
        transport.push_err("connection reset by peer");
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        match session.phase() {
            SessionPhase::FetchFailed(FetchFailure::Transport(message)) => {
                assert!(message.contains("connection reset by peer"));
            }
            other => panic!("unexpected phase: {other:?}"),
        }

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        assert!(entry.data.is_none());
        assert!(
            entry.errors.unwrap()[0]
                .message
                .contains("connection reset by peer")
        );
    }

    #[tokio::test]
    async fn test_graphql_errors_fail_the_fetch() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({
            "data": null,
            "errors": [{ "message": "Something went wrong" }]
        }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        match session.phase() {
            SessionPhase::FetchFailed(FetchFailure::Graphql(errors)) => {
                assert_eq!(errors[0].message, "Something went wrong");
            }
            other => panic!("unexpected phase: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_repository_field_is_empty_payload() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({ "data": {} }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        assert_eq!(
            *session.phase(),
            SessionPhase::FetchFailed(FetchFailure::EmptyPayload)
        );
    }

    #[tokio::test]
    async fn test_undecodable_repository_is_malformed() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({ "data": { "repository": { "id": 5 } } }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        assert!(matches!(
            session.phase(),
            SessionPhase::FetchFailed(FetchFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_newer_fetch_supersedes_older_outcome() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("first", &[]));
        transport.push_ok(repo_envelope("second", &[]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/first");
        let first = session.fetch().unwrap();
        session.set_path("octocat/second");
        let second = session.fetch().unwrap();

        let first_outcome = first.run().await;
        let second_outcome = second.run().await;

        // The older outcome is discarded without touching the cache.
        assert!(!session.apply_fetch(first_outcome));
        assert_eq!(*session.phase(), SessionPhase::Fetching);
        assert!(session.cache.read(&repo_key("octocat", "first")).is_none());

        assert!(session.apply_fetch(second_outcome));
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert_eq!(session.repository().unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_double_fetch_same_path_applies_once() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[]));
        transport.push_ok(repo_envelope("Hello-World", &[]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        let first = session.fetch().unwrap();
        let second = session.fetch().unwrap();

        assert!(session.apply_fetch(first.run().await));
        assert_eq!(*session.phase(), SessionPhase::Ready);
        let settled_revision = session.revision();

        // The leftover outcome changes nothing.
        assert!(!session.apply_fetch(second.run().await));
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert_eq!(session.revision(), settled_revision);
    }

    #[tokio::test]
    async fn test_set_path_never_triggers_a_fetch() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        session.set_path("someone/else");
        assert_eq!(transport.calls(), 1);
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert_eq!(session.repository().unwrap().name, "Hello-World");
    }

    #[tokio::test]
    async fn test_create_issue_requires_loaded_repository() {
        let transport = FakeTransport::new();
        let mut session = RepoSession::new(transport.clone());

        let result = session.create_issue("anything");
        assert!(matches!(result, Err(QuillError::InvalidState(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_title_fails_before_transport() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        let result = session.create_issue("   ");
        assert!(matches!(result, Err(QuillError::Validation(_))));
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert_eq!(transport.calls(), 1);

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        let edges = entry.data.unwrap()["repository"]["issues"]["edges"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(edges, 1);
    }

    #[tokio::test]
    async fn test_create_issue_appends_and_returns_to_ready() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        transport.push_ok(created_issue_envelope(2, "Second"));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        let pending = session.create_issue("Second").unwrap();
        assert_eq!(*session.phase(), SessionPhase::Mutating);
        session.apply_create_issue(pending.run().await);

        assert_eq!(*session.phase(), SessionPhase::Ready);
        let issues = &session.repository().unwrap().issues.edges;
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].node.number, 1);
        assert_eq!(issues[1].node.number, 2);
        assert_eq!(issues[1].node.title, "Second");
        assert_eq!(transport.calls(), 2);

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        let cached_edges = entry.data.unwrap()["repository"]["issues"]["edges"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(cached_edges, 2);
        assert!(entry.errors.is_none());
    }

    #[tokio::test]
    async fn test_create_issue_appends_into_sparse_payload() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({
            "data": {
                "repository": {
                    "id": "R1",
                    "name": "Hello-World",
                    "url": "https://github.com/octocat/Hello-World"
                }
            }
        }));
        transport.push_ok(created_issue_envelope(1, "First"));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);
        assert_eq!(*session.phase(), SessionPhase::Ready);

        let pending = session.create_issue("First").unwrap();
        session.apply_create_issue(pending.run().await);

        assert_eq!(*session.phase(), SessionPhase::Ready);
        let issues = &session.repository().unwrap().issues.edges;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].node.number, 1);
        assert_eq!(issues[0].node.title, "First");

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        let cached_edges = entry.data.unwrap()["repository"]["issues"]["edges"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(cached_edges, 1);
    }

    #[tokio::test]
    async fn test_mutation_errors_keep_the_loaded_repository() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        transport.push_ok(json!({
            "data": null,
            "errors": [{ "message": "Resource not accessible" }]
        }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        let pending = session.create_issue("Second").unwrap();
        session.apply_create_issue(pending.run().await);

        match session.phase() {
            SessionPhase::MutationFailed(errors) => {
                assert_eq!(errors[0].message, "Resource not accessible");
            }
            other => panic!("unexpected phase: {other:?}"),
        }

        // View and cache stay on the fetched state.
        assert_eq!(session.repository().unwrap().issues.edges.len(), 1);
        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        let edges = entry.data.unwrap()["repository"]["issues"]["edges"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(edges, 1);
        assert!(entry.errors.is_none());
    }

    #[tokio::test]
    async fn test_mutation_failure_blocks_fetch_until_dismissed() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[]));
        transport.push_err("boom");
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        let pending = session.create_issue("Title").unwrap();
        session.apply_create_issue(pending.run().await);
        assert!(matches!(session.phase(), SessionPhase::MutationFailed(_)));

        assert!(matches!(
            session.fetch(),
            Err(QuillError::InvalidState(_))
        ));

        session.dismiss_mutation_error();
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert!(session.fetch().is_ok());
    }

    #[tokio::test]
    async fn test_mutation_without_issue_payload_fails() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[]));
        transport.push_ok(json!({ "data": { "createIssue": null } }));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);

        let pending = session.create_issue("Title").unwrap();
        session.apply_create_issue(pending.run().await);

        assert!(matches!(session.phase(), SessionPhase::MutationFailed(_)));
        assert!(session.repository().is_some());
    }

    #[tokio::test]
    async fn test_refetch_replaces_patched_entry_wholesale() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        transport.push_ok(created_issue_envelope(2, "Second"));
        transport.push_ok(repo_envelope("Hello-World", &[(1, "First")]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);
        let pending = session.create_issue("Second").unwrap();
        session.apply_create_issue(pending.run().await);
        assert_eq!(session.repository().unwrap().issues.edges.len(), 2);

        // An authoritative refetch wins over the local patch.
        assert!(fetch_and_apply(&mut session).await);
        assert_eq!(session.repository().unwrap().issues.edges.len(), 1);

        let entry = session
            .cache
            .read(&repo_key("octocat", "Hello-World"))
            .unwrap();
        let edges = entry.data.unwrap()["repository"]["issues"]["edges"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(edges, 1);
    }

    #[tokio::test]
    async fn test_revision_bumps_on_every_transition() {
        let transport = FakeTransport::new();
        transport.push_ok(repo_envelope("Hello-World", &[]));
        let mut session = RepoSession::new(transport.clone());
        assert_eq!(session.revision(), 0);

        session.set_path("octocat/Hello-World");
        let pending = session.fetch().unwrap();
        assert_eq!(session.revision(), 1);

        session.apply_fetch(pending.run().await);
        assert_eq!(session.revision(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_then_new_search_recovers() {
        let transport = FakeTransport::new();
        transport.push_ok(json!({ "data": { "repository": null } }));
        transport.push_ok(repo_envelope("Hello-World", &[]));
        let mut session = RepoSession::new(transport.clone());

        session.set_path("octocat/missing");
        assert!(fetch_and_apply(&mut session).await);
        assert!(matches!(session.phase(), SessionPhase::FetchFailed(_)));

        session.set_path("octocat/Hello-World");
        assert!(fetch_and_apply(&mut session).await);
        assert_eq!(*session.phase(), SessionPhase::Ready);
        assert_eq!(session.repository().unwrap().name, "Hello-World");
    }
}
