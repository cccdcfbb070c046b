//! Stream and subscription naming scheme.
//!
//! Subscription names carry enough structure to correlate an inbound event
//! back to the pool and event kind that produced it:
//! `scope:poolLocator:eventName[:poolData]`. The pool-creation subscription
//! that watches for new pools uses the sentinel [`BASE_SUBSCRIPTION`] in the
//! locator position. Unpacking never fails: persisted subscriptions may
//! predate the current scheme, and the migration check needs to flag those,
//! not crash on them.

/// Separator between subscription name fields. Pool locators and event names
/// are validated upstream to exclude it.
pub const NAME_DELIMITER: char = ':';

/// Locator sentinel for the stream-wide pool-creation subscription.
pub const BASE_SUBSCRIPTION: &str = "base";

/// Current-scheme name for the connector's event stream.
pub fn stream_name(topic: &str, instance_path: &str) -> String {
    format!("{topic}/{instance_path}")
}

/// Historical stream names to fall back to when the current-scheme stream is
/// absent, in probing order. Kept as data so the compatibility surface stays
/// auditable.
pub fn default_legacy_stream_names(topic: &str, instance_path: &str) -> Vec<String> {
    vec![instance_path.to_string(), topic.to_string()]
}

/// Fields recovered from a subscription name.
///
/// `pool_locator` and `event` both absent signals a name that does not match
/// the current scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSubscriptionName {
    pub scope: Option<String>,
    pub pool_locator: Option<String>,
    pub event: Option<String>,
    pub pool_data: Option<String>,
}

/// Pack scope, pool locator (or [`BASE_SUBSCRIPTION`]), event name, and
/// optional pool data into a subscription name.
pub fn pack_subscription_name(
    scope: &str,
    pool_locator: &str,
    event: &str,
    pool_data: Option<&str>,
) -> String {
    match pool_data {
        Some(pool_data) => {
            format!("{scope}{NAME_DELIMITER}{pool_locator}{NAME_DELIMITER}{event}{NAME_DELIMITER}{pool_data}")
        }
        None => format!("{scope}{NAME_DELIMITER}{pool_locator}{NAME_DELIMITER}{event}"),
    }
}

/// Unpack a subscription name.
///
/// Trailing segments beyond the event name are rejoined into `pool_data`, so
/// packing and unpacking round-trips even when the pool data itself contains
/// the delimiter. Names with fewer than three segments come back with
/// `pool_locator` and `event` absent.
pub fn unpack_subscription_name(name: &str) -> ParsedSubscriptionName {
    let parts: Vec<&str> = name.split(NAME_DELIMITER).collect();
    match parts.as_slice() {
        [scope, pool_locator, event] => ParsedSubscriptionName {
            scope: Some((*scope).to_string()),
            pool_locator: Some((*pool_locator).to_string()),
            event: Some((*event).to_string()),
            pool_data: None,
        },
        [scope, pool_locator, event, rest @ ..] => ParsedSubscriptionName {
            scope: Some((*scope).to_string()),
            pool_locator: Some((*pool_locator).to_string()),
            event: Some((*event).to_string()),
            pool_data: Some(rest.join(&NAME_DELIMITER.to_string())),
        },
        _ => ParsedSubscriptionName::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name_scheme() {
        assert_eq!(stream_name("tessera", "0xabc"), "tessera/0xabc");
    }

    #[test]
    fn test_round_trip_without_pool_data() {
        let name = pack_subscription_name("tessera/0xabc", "F1", "TransferSingle", None);
        assert_eq!(name, "tessera/0xabc:F1:TransferSingle");
        let parsed = unpack_subscription_name(&name);
        assert_eq!(parsed.scope.as_deref(), Some("tessera/0xabc"));
        assert_eq!(parsed.pool_locator.as_deref(), Some("F1"));
        assert_eq!(parsed.event.as_deref(), Some("TransferSingle"));
        assert_eq!(parsed.pool_data, None);
    }

    #[test]
    fn test_round_trip_with_pool_data() {
        let name = pack_subscription_name(
            "tessera/0xabc",
            "N2&0xdef&100",
            "TransferBatch",
            Some("app-correlation"),
        );
        let parsed = unpack_subscription_name(&name);
        assert_eq!(parsed.pool_locator.as_deref(), Some("N2&0xdef&100"));
        assert_eq!(parsed.event.as_deref(), Some("TransferBatch"));
        assert_eq!(parsed.pool_data.as_deref(), Some("app-correlation"));
    }

    #[test]
    fn test_pool_data_containing_delimiter_round_trips() {
        let name =
            pack_subscription_name("scope", "F1", "TransferSingle", Some("left:right:tail"));
        let parsed = unpack_subscription_name(&name);
        assert_eq!(parsed.pool_data.as_deref(), Some("left:right:tail"));
    }

    #[test]
    fn test_base_subscription_round_trip() {
        let name =
            pack_subscription_name("tessera/0xabc", BASE_SUBSCRIPTION, "TokenPoolCreation", None);
        let parsed = unpack_subscription_name(&name);
        assert_eq!(parsed.pool_locator.as_deref(), Some(BASE_SUBSCRIPTION));
    }

    #[test]
    fn test_unrecognized_arity_is_unparseable_not_a_panic() {
        for name in ["", "solo", "two:parts"] {
            let parsed = unpack_subscription_name(name);
            assert_eq!(parsed.pool_locator, None, "name {name:?}");
            assert_eq!(parsed.event, None, "name {name:?}");
        }
    }

    #[test]
    fn test_legacy_candidates_are_ordered() {
        let legacy = default_legacy_stream_names("tessera", "0xabc");
        assert_eq!(legacy, vec!["0xabc".to_string(), "tessera".to_string()]);
    }
}
