//! Span search query builder
//!
//! Builds the backend's search-query string from typed filter primitives.
//! Each method appends exactly one clause; clauses render in insertion order
//! and are joined by single spaces (implicit AND in the backend grammar).

/// Milliseconds to the backend's nanosecond duration unit
const MS_TO_NS: i64 = 1_000_000;

/// Chainable builder for span search queries
///
/// No validation of filter values happens here; sanitizing free text is the
/// caller's responsibility.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    clauses: Vec<String>,
}

impl QueryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by service name
    pub fn service(mut self, service: &str) -> Self {
        self.clauses.push(format!("service:{service}"));
        self
    }

    /// Filter by deployment environment
    ///
    /// Renders as a disjunction over both tag keys (`env:` OR `environment:`)
    /// because instrumentation is inconsistent about which one it populates.
    pub fn environment(mut self, environment: &str) -> Self {
        self.clauses
            .push(format!("(env:{environment} OR environment:{environment})"));
        self
    }

    /// Filter by span kind (e.g. `entry`, `client`)
    pub fn span_kind(mut self, kind: &str) -> Self {
        self.clauses.push(format!("@span.kind:{kind}"));
        self
    }

    /// Filter by span status (e.g. `ok`, `error`)
    pub fn status(mut self, status: &str) -> Self {
        self.clauses.push(format!("status:{status}"));
        self
    }

    /// Filter by exact operation name
    pub fn operation_name(mut self, name: &str) -> Self {
        self.clauses.push(format!("operation_name:\"{name}\""));
        self
    }

    /// Filter by exact resource name
    pub fn resource_name(mut self, name: &str) -> Self {
        self.clauses.push(format!("resource_name:\"{name}\""));
        self
    }

    /// Keep spans with duration >= the given milliseconds
    pub fn duration_greater_than(mut self, ms: i64) -> Self {
        self.clauses.push(format!("@duration:>={}", ms * MS_TO_NS));
        self
    }

    /// Keep spans with duration < the given milliseconds
    pub fn duration_less_than(mut self, ms: i64) -> Self {
        self.clauses.push(format!("@duration:<{}", ms * MS_TO_NS));
        self
    }

    /// Keep spans with duration inside `[min_ms, max_ms]`
    pub fn duration_between(mut self, min_ms: i64, max_ms: i64) -> Self {
        self.clauses.push(format!(
            "@duration:[{} TO {}]",
            min_ms * MS_TO_NS,
            max_ms * MS_TO_NS
        ));
        self
    }

    /// Filter by HTTP method (upper-cased)
    pub fn http_method(mut self, method: &str) -> Self {
        self.clauses
            .push(format!("@http.method:{}", method.to_uppercase()));
        self
    }

    /// Filter by HTTP status code
    pub fn http_status(mut self, status: u16) -> Self {
        self.clauses.push(format!("@http.status_code:{status}"));
        self
    }

    /// Filter by exact HTTP URL
    pub fn http_url(mut self, url: &str) -> Self {
        self.clauses.push(format!("@http.url:\"{url}\""));
        self
    }

    /// Filter by exact error type
    pub fn error_type(mut self, error_type: &str) -> Self {
        self.clauses.push(format!("@error.type:\"{error_type}\""));
        self
    }

    /// Filter by exact error message
    pub fn error_message(mut self, message: &str) -> Self {
        self.clauses.push(format!("@error.message:\"{message}\""));
        self
    }

    /// Filter by downstream peer service
    pub fn peer_service(mut self, peer: &str) -> Self {
        self.clauses.push(format!("@peer.service:{peer}"));
        self
    }

    /// Append a raw clause verbatim
    pub fn raw(mut self, clause: &str) -> Self {
        self.clauses.push(clause.to_string());
        self
    }

    /// Render the accumulated clauses as one query string
    pub fn build(&self) -> String {
        self.clauses.join(" ")
    }

    /// Clear all accumulated clauses
    pub fn reset(&mut self) {
        self.clauses.clear();
    }

    /// Copy of the accumulated clauses, for introspection and tests
    pub fn filters(&self) -> Vec<String> {
        self.clauses.clone()
    }
}
