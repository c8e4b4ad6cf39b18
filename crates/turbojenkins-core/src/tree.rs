//! Builders for Jenkins `tree=` projections.
//!
//! The projection syntax itself (`jobs[name,url]`) is passed to the server
//! verbatim; these helpers only assemble the recurring shapes.

/// Build the projection that fetches job URLs `depth` levels below the
/// starting folder in one request.
///
/// ```rust
/// use turbojenkins_core::tree::nested_jobs_query;
///
/// assert_eq!(nested_jobs_query(0), "jobs[url]");
/// assert_eq!(nested_jobs_query(2), "jobs[url,jobs[url,jobs[url]]]");
/// ```
pub fn nested_jobs_query(depth: usize) -> String {
    (0..depth).fold(String::from("jobs[url]"), |query, _| {
        format!("jobs[url,{query}]")
    })
}

/// Projection listing the builds currently held by executors.
///
/// Freestyle builds show up under `executors`, pipeline runs under
/// `oneOffExecutors`.
pub const EXECUTABLES_QUERY: &str =
    "executors[currentExecutable[url]],oneOffExecutors[currentExecutable[url]]";

/// [`EXECUTABLES_QUERY`] applied to every computer of the `computer/` list.
pub fn computers_executables_query() -> String {
    format!("computer[{EXECUTABLES_QUERY}]")
}
