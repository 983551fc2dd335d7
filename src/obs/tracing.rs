// self
use crate::{_prelude::*, obs::Operation};

/// Span wrapper used by the ticket manager and the token endpoint.
#[derive(Clone, Debug)]
pub struct CredentialSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CredentialSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"credential_lifecycle.operation",
				operation = operation.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Enters the span until the returned guard drops.
	pub fn entered(self) -> CredentialSpanGuard {
		#[cfg(feature = "tracing")]
		{
			CredentialSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			CredentialSpanGuard {}
		}
	}
}

/// RAII guard returned by [`CredentialSpan::entered`].
pub struct CredentialSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for CredentialSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("CredentialSpanGuard(..)")
	}
}
