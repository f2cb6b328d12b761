// ── Authentication ──
//
// Password checks and the failed-login counter update for one account
// run under that account's mutex, so concurrent attempts cannot lose a
// counter increment.

use dirprov_api::Modification;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use super::Provisioning;
use crate::error::CoreError;
use crate::model::{Account, AccountStatus, Nameable};
use crate::schema;

/// Decides whether a password matches an account.
pub trait PasswordVerifier: Send + Sync {
    fn verify(&self, account: &Account, password: &SecretString) -> bool;
}

/// Compares against the stored `userPassword` value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredPasswordVerifier;

impl PasswordVerifier for StoredPasswordVerifier {
    fn verify(&self, account: &Account, password: &SecretString) -> bool {
        account
            .entry()
            .attr(schema::USER_PASSWORD)
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), password.expose_secret().as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl Provisioning {
    /// Verify a password, maintaining the failed-login counter and
    /// locking the account out once the policy limit is reached.
    pub fn authenticate(&self, name: &str, password: &SecretString) -> Result<Account, CoreError> {
        let fail = |reason: &str| CoreError::AuthenticationFailed {
            account: name.to_owned(),
            reason: reason.to_owned(),
        };
        let account = match self.find_account(name) {
            Ok(Some(account)) => account,
            Ok(None) => return Err(fail("no such account")),
            Err(e) if matches!(e, CoreError::Validation { .. }) => return Err(fail("no such account")),
            Err(e) => return Err(e),
        };

        let lock = self.auth_lock(account.id());
        let _guard = lock.lock();

        // Another attempt may have changed the counter or status.
        let entry = account.entry();
        self.reload(entry, &entry.dn())?;

        let status = account.status();
        if !status.allows_login() {
            return Err(fail(&format!("account status is {status}")));
        }

        if self.verifier().verify(&account, password) {
            if account.failed_login_count() > 0 {
                self.modify_entry(entry, &[Modification::delete_attr(schema::FAILED_LOGIN_COUNT)])?;
            }
            info!(account = %account.name(), "authenticated");
            return Ok(account);
        }

        let failures = account.failed_login_count().saturating_add(1);
        let policy = self.config().lockout;
        let mut mods = vec![Modification::replace(
            schema::FAILED_LOGIN_COUNT,
            [failures.to_string()],
        )];
        let locking = policy.enabled && failures >= policy.max_failures;
        if locking {
            mods.push(Modification::replace(
                schema::ACCOUNT_STATUS,
                [AccountStatus::Lockout.to_string()],
            ));
        }
        self.modify_entry(entry, &mods)?;
        if locking {
            warn!(account = %account.name(), failures, "account locked out");
        }
        Err(fail("invalid credentials"))
    }
}
