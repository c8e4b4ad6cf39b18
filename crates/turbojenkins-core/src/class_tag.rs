//! `_class` discriminator handling.
//!
//! Every Jenkins JSON record carries a fully qualified server-side class
//! name such as `org.jenkinsci.plugins.workflow.job.WorkflowJob` or
//! `hudson.model.Queue$LeftItem`. Client-side wrappers are keyed by the last
//! component of that name.

/// Return the registry key for a fully qualified `_class` value.
///
/// The key is the text after the last `.` or `$`.
///
/// ```rust
/// use turbojenkins_core::class_tag::type_tag;
///
/// assert_eq!(type_tag("hudson.model.FreeStyleProject"), "FreeStyleProject");
/// assert_eq!(type_tag("hudson.model.Queue$BlockedItem"), "BlockedItem");
/// assert_eq!(type_tag("Folder"), "Folder");
/// ```
pub fn type_tag(class_name: &str) -> &str {
    class_name
        .rsplit(['.', '$'])
        .next()
        .unwrap_or(class_name)
}
