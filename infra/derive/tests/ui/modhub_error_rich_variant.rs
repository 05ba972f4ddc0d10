use modhub_derive::modhub_error;
use std::borrow::Cow;
use std::sync::Arc;

#[modhub_error]
#[derive(Clone)]
pub enum DemoError {
    #[error("Step '{step}' failed{}: {source}", format_context(.context))]
    Step {
        step: String,
        #[source]
        source: Arc<std::io::Error>,
        context: Option<Cow<'static, str>>,
    },
}

fn main() {
    let err = DemoError::Step {
        step: "fetch".to_owned(),
        source: Arc::new(std::io::Error::other("offline")),
        context: None,
    };
    let copy = err.clone();
    let with_context: Result<(), DemoError> = Err(copy);
    let with_context = with_context.context("warmup").unwrap_err();
    assert_eq!(err.to_string(), "Step 'fetch' failed: offline");
    assert_eq!(with_context.to_string(), "Step 'fetch' failed (warmup): offline");
}
