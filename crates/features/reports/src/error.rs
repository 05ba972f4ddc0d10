use std::borrow::Cow;

#[modhub_derive::modhub_error]
pub enum ReportError {
    #[error("Report error{}: {source}", format_context(.context))]
    User { source: modhub_user::UserError, context: Option<Cow<'static, str>> },

    #[error("Internal report error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
