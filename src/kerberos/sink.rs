//! Publication of the credential pointer that tells Kerberos libraries where the ticket lives.

// self
use crate::_prelude::*;

/// Environment variable Kerberos libraries read to locate the ticket cache.
pub const KRB5CCNAME: &str = "KRB5CCNAME";

/// Receives `name=value` credential pointers such as `KRB5CCNAME=FILE:/tmp/krb5cc`.
pub trait CredentialSink
where
	Self: Send + Sync,
{
	/// Publishes `value` under `name`, replacing any earlier value.
	fn publish(&self, name: &str, value: &str);
}

/// Sink that writes the process environment.
#[derive(Debug)]
pub struct EnvCredentialSink(());
impl EnvCredentialSink {
	/// Creates a sink that mutates the process environment on every publish.
	///
	/// # Safety
	///
	/// Every publish calls [`std::env::set_var`]. The caller must guarantee that no other thread
	/// reads or writes the environment while this sink is in use, typically by only publishing
	/// before worker threads start or from a process that is otherwise single threaded.
	pub unsafe fn new() -> Self {
		Self(())
	}
}
impl CredentialSink for EnvCredentialSink {
	fn publish(&self, name: &str, value: &str) {
		// SAFETY: exclusive environment access is a precondition of `EnvCredentialSink::new`.
		unsafe { std::env::set_var(name, value) };
	}
}

/// Sink that records publications in memory; clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct MemoryCredentialSink(Arc<Mutex<BTreeMap<String, String>>>);
impl MemoryCredentialSink {
	/// Latest value published under `name`.
	pub fn get(&self, name: &str) -> Option<String> {
		self.0.lock().get(name).cloned()
	}

	/// Snapshot of every published pointer.
	pub fn published(&self) -> BTreeMap<String, String> {
		self.0.lock().clone()
	}
}
impl CredentialSink for MemoryCredentialSink {
	fn publish(&self, name: &str, value: &str) {
		self.0.lock().insert(name.to_owned(), value.to_owned());
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn memory_sink_keeps_latest_value() {
		let sink = MemoryCredentialSink::default();
		let shared = sink.clone();

		sink.publish(KRB5CCNAME, "FILE:/tmp/a");
		shared.publish(KRB5CCNAME, "FILE:/tmp/b");

		assert_eq!(sink.get(KRB5CCNAME).as_deref(), Some("FILE:/tmp/b"));
		assert_eq!(sink.published().len(), 1);
	}

	#[test]
	fn env_sink_sets_variable() {
		let name = "CREDENTIAL_LIFECYCLE_ENV_SINK_TEST";
		// SAFETY: this variable is unique to this test and read only here.
		let sink = unsafe { EnvCredentialSink::new() };

		sink.publish(name, "FILE:/tmp/krb5cc_test");

		assert_eq!(std::env::var(name).as_deref(), Ok("FILE:/tmp/krb5cc_test"));
	}
}
