//! JNI exports for `dev.syafii.rustlab.nativeconfig.NativeConfig`.
//!
//! The global store is created in `JNI_OnLoad` with the default configuration.
//! Signatures match the Kotlin declarations: getters return a non-null
//! `String`, while `clearBaseUrl()`, `setToken(String)` and `clearToken()`
//! return nothing. Nothing here throws into the JVM. A failed getter returns
//! `""` and a failed mutator leaves the store as it was; both are logged.
//!
//! Rust-side copies of values are wiped before they are freed. The jni crate
//! re-encodes every string it hands to the JVM into a modified-UTF-8 buffer
//! of its own, and that buffer is released without wiping. Java strings are
//! immutable and garbage collected, so the host side cannot be wiped either.

use std::ffi::c_void;

use jni::objects::{JClass, JString};
use jni::sys::{jint, jstring, JNI_VERSION_1_6};
use jni::JNIEnv;
use zeroize::Zeroizing;

use crate::boundary::BoundaryResult;
use crate::config::{ConfigError, StoreConfig};
use crate::global;

#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: *mut jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    match global::init(&StoreConfig::default()) {
        Ok(_) => tracing::info!("native config store loaded"),
        Err(ConfigError::AlreadyInitialized) => tracing::debug!("native config store already loaded"),
        Err(err) => tracing::error!(error = %err, "native config store failed to initialize"),
    }
    JNI_VERSION_1_6
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_getBaseUrl(
    mut env: JNIEnv,
    _: JClass,
) -> jstring {
    to_java_string(&mut env, "getBaseUrl", global::get_base_url())
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_clearBaseUrl(
    _: JNIEnv,
    _: JClass,
) {
    log_failure("clearBaseUrl", global::clear_base_url());
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_getPreferenceName(
    mut env: JNIEnv,
    _: JClass,
) -> jstring {
    to_java_string(&mut env, "getPreferenceName", global::get_preference_name())
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_setToken(
    mut env: JNIEnv,
    _: JClass,
    token: JString,
) {
    let input: Zeroizing<String> = match env.get_string(&token) {
        Ok(value) => Zeroizing::new(value.into()),
        Err(err) => {
            tracing::warn!(error = %err, "setToken: unreadable java string");
            return;
        }
    };
    log_failure("setToken", global::set_token(input.as_bytes()));
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_getToken(
    mut env: JNIEnv,
    _: JClass,
) -> jstring {
    to_java_string(&mut env, "getToken", global::get_token())
}

#[no_mangle]
pub extern "system" fn Java_dev_syafii_rustlab_nativeconfig_NativeConfig_clearToken(
    _: JNIEnv,
    _: JClass,
) {
    log_failure("clearToken", global::clear_token());
}

/// Copies the value into a new Java string and wipes the Rust-side copy.
///
/// If the JVM cannot allocate the string an exception is already pending.
/// The JVM ignores the return value in that case, so the null handed back
/// never reaches Kotlin code; the exception surfaces instead.
fn to_java_string(env: &mut JNIEnv, op: &str, result: BoundaryResult) -> jstring {
    let value = outgoing_text(op, result);
    match env.new_string(value.as_str()) {
        Ok(string) => string.into_raw(),
        Err(err) => {
            tracing::error!(op, error = %err, "could not allocate java string");
            if !env.exception_check().unwrap_or(true) {
                if let Ok(empty) = env.new_string("") {
                    return empty.into_raw();
                }
            }
            std::ptr::null_mut()
        }
    }
}

/// The text a getter hands to the host: the value, or `""` on failure.
fn outgoing_text(op: &str, result: BoundaryResult) -> Zeroizing<String> {
    Zeroizing::new(result.unwrap_or_else(|err| {
        tracing::error!(op, kind = %err.kind(), error = %err, "returning empty string");
        String::new()
    }))
}

fn log_failure(op: &str, result: BoundaryResult<()>) {
    if let Err(err) = result {
        tracing::warn!(op, kind = %err.kind(), code = err.kind().code(), error = %err, "operation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::{log_failure, outgoing_text};
    use crate::error::StoreError;

    #[test]
    fn failed_getters_hand_over_empty_text() {
        assert_eq!(outgoing_text("getToken", Ok("abc".to_string())).as_str(), "abc");
        assert_eq!(outgoing_text("getToken", Err(StoreError::NotInitialized)).as_str(), "");
    }

    #[test]
    fn mutator_failures_are_absorbed() {
        log_failure("clearToken", Ok(()));
        log_failure(
            "setToken",
            Err(StoreError::ValueTooLarge { len: 9000, max: 8192 }),
        );
    }
}
