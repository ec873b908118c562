//! Property-based test generators using proptest.

use filestore_connector::ConnectionRequestInfo;
use proptest::prelude::*;

/// Strategy for generating user names.
pub fn user_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating request info, including the absent case.
pub fn request_info_strategy() -> impl Strategy<Value = Option<ConnectionRequestInfo>> {
    let info = (
        prop::option::of(user_name_strategy()),
        prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..4),
    )
        .prop_map(|(user_name, properties)| {
            let base = match user_name {
                Some(name) => ConnectionRequestInfo::new().with_user_name(name),
                None => ConnectionRequestInfo::new(),
            };
            properties
                .into_iter()
                .fold(base, |info, (key, value)| info.with_property(key, value))
        });
    prop::option::of(info)
}

/// Strategy for generating valid blob names.
pub fn blob_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9][a-zA-Z0-9_-]{0,15}(\\.[a-z]{1,4})?")
        .expect("Invalid regex")
}

/// Strategy for generating blob contents.
pub fn blob_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}
