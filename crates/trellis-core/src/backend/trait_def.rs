//! The `Backend` trait -- the adapter interface for generative text models.
//!
//! The trait is object-safe so callers can hold `&dyn Backend` without
//! caring which model or process sits behind it.

use anyhow::Result;
use async_trait::async_trait;

/// A generative text backend.
///
/// # Object Safety
///
/// Every method returns a concrete type, so `Box<dyn Backend>` and
/// `&dyn Backend` both work.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable name for this backend (e.g. "claude-code").
    fn name(&self) -> &str;

    /// Send a prompt and wait for the complete reply.
    ///
    /// Returns `Ok(None)` when the backend produced no text (or only
    /// whitespace). Transport or process failures are `Err`.
    async fn complete(&self, prompt: &str) -> Result<Option<String>>;
}

// Compile-time assertion: Backend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Backend) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes the prompt back, used only to prove the trait can be
    /// implemented and used as `dyn Backend`.
    struct EchoBackend;

    #[async_trait]
    impl Backend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<Option<String>> {
            Ok(Some(prompt.to_string()))
        }
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn Backend> = Box::new(EchoBackend);
        assert_eq!(backend.name(), "echo");
    }

    #[tokio::test]
    async fn echo_backend_completes() {
        let backend: &dyn Backend = &EchoBackend;
        let reply = backend.complete("hello").await.unwrap();
        assert_eq!(reply.as_deref(), Some("hello"));
    }
}
