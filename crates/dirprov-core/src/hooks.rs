// ── Schema hooks ──
//
// The engine calls these before every create and modify. Implementations
// may reject a change or fill in derived attributes; the engine never
// validates attribute schemas itself.

use dirprov_api::{Attributes, Dn, Modification};

use crate::error::CoreError;
use crate::model::EntryKind;
use crate::schema;

pub trait SchemaHooks: Send + Sync {
    /// Inspect or complete the attributes of an entry about to be created.
    fn before_create(
        &self,
        kind: EntryKind,
        dn: &Dn,
        attrs: &mut Attributes,
    ) -> Result<(), CoreError>;

    /// Inspect a modify request before it is sent.
    fn before_modify(
        &self,
        kind: EntryKind,
        dn: &Dn,
        mods: &[Modification],
    ) -> Result<(), CoreError>;
}

/// Keeps ids immutable once written and stamps creation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaHooks;

impl SchemaHooks for DefaultSchemaHooks {
    fn before_create(
        &self,
        kind: EntryKind,
        dn: &Dn,
        attrs: &mut Attributes,
    ) -> Result<(), CoreError> {
        if attrs.get_one(schema::ENTRY_ID).is_none() {
            return Err(CoreError::Internal(format!("{kind} at {dn} has no {}", schema::ENTRY_ID)));
        }
        if !attrs.contains(schema::CREATE_TIMESTAMP) {
            let now = chrono::Utc::now().format("%Y%m%d%H%M%SZ").to_string();
            attrs.set(schema::CREATE_TIMESTAMP, [now]);
        }
        Ok(())
    }

    fn before_modify(
        &self,
        kind: EntryKind,
        dn: &Dn,
        mods: &[Modification],
    ) -> Result<(), CoreError> {
        // Adding an id to an entry that has none is how plain entries are
        // promoted; replacing or deleting one is never allowed.
        if let Some(m) = mods.iter().find(|m| {
            m.attr().eq_ignore_ascii_case(schema::ENTRY_ID) && !matches!(m, Modification::Add { .. })
        }) {
            return Err(CoreError::validation(format!(
                "{} of {kind} {dn} is immutable (attempted {m:?})",
                schema::ENTRY_ID
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_is_immutable() {
        let hooks = DefaultSchemaHooks;
        let dn = Dn::parse("uid=a,ou=people,dc=a,dc=com").unwrap();
        let err = hooks
            .before_modify(
                EntryKind::Account,
                &dn,
                &[Modification::replace(schema::ENTRY_ID, ["x"])],
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));

        hooks
            .before_modify(EntryKind::Account, &dn, &[Modification::add(schema::MAIL, ["a@a.com"])])
            .unwrap();
        hooks
            .before_modify(EntryKind::Domain, &dn, &[Modification::add(schema::ENTRY_ID, ["1"])])
            .unwrap();
    }

    #[test]
    fn create_is_timestamped() {
        let hooks = DefaultSchemaHooks;
        let dn = Dn::parse("uid=a,ou=people,dc=a,dc=com").unwrap();
        let mut attrs = Attributes::new().with(schema::ENTRY_ID, "1");
        hooks.before_create(EntryKind::Account, &dn, &mut attrs).unwrap();
        assert!(attrs.contains(schema::CREATE_TIMESTAMP));

        let mut bare = Attributes::new();
        assert!(hooks.before_create(EntryKind::Account, &dn, &mut bare).is_err());
    }
}
