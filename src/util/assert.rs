/// Panics with a Firestore-styled internal assertion message when the condition is false.
///
/// Reserved for precondition violations in calling code; invalid external input must surface as
/// an error instead.
#[track_caller]
pub fn hard_assert(condition: bool, message: impl AsRef<str>) {
    if !condition {
        hard_fail(message);
    }
}

/// Unconditionally panics with a Firestore-styled internal assertion message.
#[track_caller]
pub fn hard_fail(message: impl AsRef<str>) -> ! {
    panic!("{}", assertion_error(message))
}

/// Builds the message used for internal assertion failures.
pub fn assertion_error(message: impl AsRef<str>) -> String {
    format!(
        "FIRESTORE ({}) INTERNAL ASSERTION FAILED: {}",
        env!("CARGO_PKG_VERSION"),
        message.as_ref()
    )
}
