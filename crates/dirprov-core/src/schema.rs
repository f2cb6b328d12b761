//! Attribute and object class names the engine reads and writes.
//!
//! Names are compared case-insensitively by the store; the constants keep
//! their conventional camel case for readability in rendered entries.

// ── Naming attributes ───────────────────────────────────────────────

pub const UID: &str = "uid";
pub const CN: &str = "cn";
pub const DC: &str = "dc";
pub const OU: &str = "ou";

// ── Common attributes ───────────────────────────────────────────────

pub const OBJECT_CLASS: &str = "objectClass";
pub const ENTRY_ID: &str = "entryId";
pub const CREATE_TIMESTAMP: &str = "createTimestamp";
pub const DESCRIPTION: &str = "description";

// ── Addresses ───────────────────────────────────────────────────────

pub const MAIL: &str = "mail";
pub const MAIL_ALIAS: &str = "mailAlias";
pub const MAIL_DELIVERY_ADDRESS: &str = "mailDeliveryAddress";
/// Static group member list; also the flat list on a dynamic group's external unit.
pub const MAIL_FORWARDING_ADDRESS: &str = "mailForwardingAddress";
pub const FOREIGN_PRINCIPAL: &str = "foreignPrincipal";

// ── Accounts ────────────────────────────────────────────────────────

pub const ACCOUNT_STATUS: &str = "accountStatus";
pub const COS_ID: &str = "cosId";
pub const USER_PASSWORD: &str = "userPassword";
pub const FAILED_LOGIN_COUNT: &str = "failedLoginCount";
pub const IS_DELEGATED_ADMIN: &str = "isDelegatedAdmin";

// ── Aliases ─────────────────────────────────────────────────────────

pub const ALIAS_TARGET_ID: &str = "aliasTargetId";

// ── Groups ──────────────────────────────────────────────────────────

/// Dynamic group back-reference carried by member entries.
pub const MEMBER_OF: &str = "memberOf";
pub const MEMBER_URL: &str = "memberURL";
pub const IS_ADMIN_GROUP: &str = "isAdminGroup";
pub const IS_CUSTOM_FILTER: &str = "isCustomFilterGroup";

// ── Domains ─────────────────────────────────────────────────────────

pub const DOMAIN_NAME: &str = "domainName";
pub const DOMAIN_TYPE: &str = "domainType";
pub const DOMAIN_STATUS: &str = "domainStatus";
pub const DOMAIN_ALIAS_TARGET_ID: &str = "domainAliasTargetId";
pub const VIRTUAL_HOSTNAME: &str = "virtualHostname";
pub const DOMAIN_RENAME_INFO: &str = "domainRenameInfo";

// ── Object classes ──────────────────────────────────────────────────

pub const OC_ACCOUNT: &str = "dirAccount";
pub const OC_ALIAS: &str = "dirAlias";
pub const OC_STATIC_GROUP: &str = "dirDistributionList";
pub const OC_DYNAMIC_GROUP: &str = "dirGroup";
pub const OC_DYNAMIC_GROUP_UNIT: &str = "dirGroupUnit";
pub const OC_DOMAIN: &str = "dirDomain";
pub const OC_DC_OBJECT: &str = "dcObject";
pub const OC_COS: &str = "dirCos";
pub const OC_SERVER: &str = "dirServer";
pub const OC_UC_SERVICE: &str = "dirUcService";
pub const OC_CONTAINER: &str = "dirContainer";

// ── Fixed names ─────────────────────────────────────────────────────

pub const INTERNAL_UNIT: &str = "internal";
pub const EXTERNAL_UNIT: &str = "external";
pub const COS_CONTAINER: &str = "cos";
pub const SERVER_CONTAINER: &str = "servers";
pub const UC_SERVICE_CONTAINER: &str = "ucservices";
pub const ADMIN_CONTAINER: &str = "admins";

pub const TRUE: &str = "TRUE";
pub const FALSE: &str = "FALSE";

/// Parse a directory boolean (`TRUE`/`FALSE`, case-insensitive).
pub fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(TRUE))
}

pub fn bool_value(flag: bool) -> &'static str {
    if flag { TRUE } else { FALSE }
}
