use kstring::KString;

/// Errors from creating views and from changing the binding
/// registry. Errors inside binding handlers are not reported this
/// way, those are only logged (see `scanner`).
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BindError {
    #[error("mnster.view: you must pass a valid template as a first argument: {0}")]
    InvalidTemplate(String),
    #[error("mnster.view: you must specify a context and a model ({0} is missing)")]
    MissingBindingContext(&'static str),
    #[error("mnster.binding: {0}")]
    InvalidArgument(String),
    #[error("mnster.binding: a binding with the name {0:?} already exists")]
    DuplicateBinding(KString),
}
