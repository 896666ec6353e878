//! Identity keys
//!
//! The identity of a subscription is the projection of the view's props
//! onto the watched keys. Two keys are compared by structural equality of
//! the serialized values; changes to unwatched props never affect it.

use crate::error::ControllerError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Projection of props onto the watched keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityKey(BTreeMap<String, Value>);

impl IdentityKey {
    /// Project `props` onto `watched_keys`
    ///
    /// Every watched key must be a field of the serialized props; a
    /// `None` field projects to `null`.
    ///
    /// # Errors
    /// - `ControllerError::Props` if the props do not serialize to a map
    ///   while keys are watched
    /// - `ControllerError::Props` if a watched key is not a prop
    pub fn project<P: Serialize>(props: &P, watched_keys: &[String]) -> Result<Self, ControllerError> {
        if watched_keys.is_empty() {
            return Ok(Self::default());
        }

        let Value::Object(mut fields) = serde_json::to_value(props)? else {
            return Err(ControllerError::Props(
                "props must serialize to a map to watch keys".into(),
            ));
        };

        watched_keys
            .iter()
            .map(|key| {
                fields
                    .remove(key)
                    .map(|value| (key.clone(), value))
                    .ok_or_else(|| ControllerError::Props(format!("watched key `{key}` is not a prop")))
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }

    /// Value projected for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Check if no key is watched
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    struct Props {
        event: u32,
        dao: String,
        theme: String,
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|k| (*k).to_string()).collect()
    }

    #[test]
    fn unknown_watched_key_is_rejected() {
        let props = Props {
            event: 1,
            dao: "0xdao".into(),
            theme: "dark".into(),
        };
        let error = IdentityKey::project(&props, &keys(&["event", "evnt"])).unwrap_err();
        assert_eq!(
            error,
            ControllerError::Props("watched key `evnt` is not a prop".into())
        );

        let key = IdentityKey::project(&props, &keys(&["event"])).unwrap();
        assert_eq!(key.get("event"), Some(&Value::from(1)));
    }

    #[test]
    fn none_field_projects_to_null() {
        #[derive(Serialize)]
        struct Optional {
            account: Option<String>,
        }

        let key = IdentityKey::project(&Optional { account: None }, &keys(&["account"])).unwrap();
        assert_eq!(key.get("account"), Some(&Value::Null));
    }

    #[test]
    fn scalar_props_cannot_be_watched() {
        assert!(IdentityKey::project(&7_u32, &keys(&["event"])).is_err());
        assert!(IdentityKey::project(&7_u32, &[]).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn unwatched_changes_keep_identity(
            event in any::<u32>(),
            dao in "[a-z0-9]{1,8}",
            theme_a in "[a-z]{0,6}",
            theme_b in "[a-z]{0,6}",
        ) {
            let watched = keys(&["event", "dao"]);
            let a = Props { event, dao: dao.clone(), theme: theme_a };
            let b = Props { event, dao, theme: theme_b };
            prop_assert_eq!(
                IdentityKey::project(&a, &watched).unwrap(),
                IdentityKey::project(&b, &watched).unwrap()
            );
        }

        #[test]
        fn watched_changes_alter_identity(
            event_a in any::<u32>(),
            event_b in any::<u32>(),
            theme in "[a-z]{0,6}",
        ) {
            let watched = keys(&["event"]);
            let a = Props { event: event_a, dao: "0xdao".into(), theme: theme.clone() };
            let b = Props { event: event_b, dao: "0xdao".into(), theme };
            let same = IdentityKey::project(&a, &watched).unwrap()
                == IdentityKey::project(&b, &watched).unwrap();
            prop_assert_eq!(same, event_a == event_b);
        }
    }
}
