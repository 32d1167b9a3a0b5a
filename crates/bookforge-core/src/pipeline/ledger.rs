//! Two-phase quota ledger: reserve before a run, commit or release after
//!
//! Outstanding reservations count against the monthly limit, so concurrent
//! runs from one account cannot jointly go past their tier.

use bookforge_types::{GenerationRequest, Tier};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::quota::check_quota;
use crate::constants::STALE_RESERVATION_HOURS;
use crate::error::{BookforgeError, Result};

/// Proof that a quota slot is held. Consumed by `commit` or `release`.
#[derive(Debug, PartialEq, Eq)]
pub struct QuotaReservation {
    id: String,
    account: String,
    tier: Tier,
}

impl QuotaReservation {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

/// Snapshot of an account's usage for the current month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuotaUsage {
    pub used: u32,
    pub reserved: u32,
}

pub trait QuotaLedger: Send + Sync {
    fn reserve(
        &self,
        account: &str,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<QuotaReservation>;

    /// Count the reserved generation; returns the account's new monthly total
    fn commit(&self, reservation: QuotaReservation) -> Result<u32>;

    fn release(&self, reservation: QuotaReservation) -> Result<()>;

    fn usage(&self, account: &str) -> Result<QuotaUsage>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct AccountUsage {
    month: String,
    used: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct PendingSlot {
    account: String,
    reserved_at: DateTime<Utc>,
}

/// Shared bookkeeping behind both ledger implementations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerBook {
    #[serde(default)]
    accounts: HashMap<String, AccountUsage>,
    // keyed by reservation id
    #[serde(default)]
    pending: HashMap<String, PendingSlot>,
}

fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

impl LedgerBook {
    fn used_this_month(&self, account: &str, month: &str) -> u32 {
        self.accounts
            .get(account)
            .filter(|usage| usage.month == month)
            .map(|usage| usage.used)
            .unwrap_or(0)
    }

    fn reserved(&self, account: &str) -> u32 {
        self.pending
            .values()
            .filter(|slot| slot.account == account)
            .count() as u32
    }

    /// Drop reservations whose run never committed or released them
    fn prune_stale(&mut self, now: DateTime<Utc>) {
        let cutoff = now - chrono::Duration::hours(STALE_RESERVATION_HOURS);
        let before = self.pending.len();
        self.pending.retain(|_, slot| slot.reserved_at > cutoff);

        let dropped = before - self.pending.len();
        if dropped > 0 {
            log::warn!("Dropped {} abandoned quota reservation(s)", dropped);
        }
    }

    fn reserve(
        &mut self,
        account: &str,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<QuotaReservation> {
        let now = Utc::now();
        self.prune_stale(now);

        let month = current_month();
        let in_flight = self.used_this_month(account, &month) + self.reserved(account);
        check_quota(tier, request, in_flight).into_result()?;

        let id = uuid::Uuid::new_v4().to_string();
        self.pending.insert(
            id.clone(),
            PendingSlot {
                account: account.to_string(),
                reserved_at: now,
            },
        );
        log::info!(
            "Reserved quota slot {} for account {} ({} in flight)",
            id,
            account,
            in_flight + 1
        );

        Ok(QuotaReservation {
            id,
            account: account.to_string(),
            tier,
        })
    }

    fn take_pending(&mut self, reservation: &QuotaReservation) -> Result<()> {
        match self.pending.remove(&reservation.id) {
            Some(_) => Ok(()),
            None => Err(BookforgeError::Validation(format!(
                "Unknown quota reservation {}",
                reservation.id
            ))),
        }
    }

    fn commit(&mut self, reservation: &QuotaReservation) -> Result<u32> {
        self.take_pending(reservation)?;

        let month = current_month();
        let usage = self
            .accounts
            .entry(reservation.account.clone())
            .or_default();
        if usage.month != month {
            usage.month = month;
            usage.used = 0;
        }
        usage.used += 1;

        log::info!(
            "Committed quota slot {} for account {}: {} used this month",
            reservation.id,
            reservation.account,
            usage.used
        );
        Ok(usage.used)
    }

    fn release(&mut self, reservation: &QuotaReservation) -> Result<()> {
        self.take_pending(reservation)?;
        log::info!(
            "Released quota slot {} for account {}",
            reservation.id,
            reservation.account
        );
        Ok(())
    }

    fn usage(&self, account: &str) -> QuotaUsage {
        QuotaUsage {
            used: self.used_this_month(account, &current_month()),
            reserved: self.reserved(account),
        }
    }
}

/// Process-local ledger
#[derive(Debug, Default)]
pub struct InMemoryQuotaLedger {
    book: Mutex<LedgerBook>,
}

impl InMemoryQuotaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account's usage for the current month
    pub fn with_usage(self, account: &str, used: u32) -> Self {
        {
            let mut book = self.book.lock().unwrap_or_else(|e| e.into_inner());
            book.accounts.insert(
                account.to_string(),
                AccountUsage {
                    month: current_month(),
                    used,
                },
            );
        }
        self
    }
}

impl QuotaLedger for InMemoryQuotaLedger {
    fn reserve(
        &self,
        account: &str,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<QuotaReservation> {
        self.book
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reserve(account, tier, request)
    }

    fn commit(&self, reservation: QuotaReservation) -> Result<u32> {
        self.book
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .commit(&reservation)
    }

    fn release(&self, reservation: QuotaReservation) -> Result<()> {
        self.book
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .release(&reservation)
    }

    fn usage(&self, account: &str) -> Result<QuotaUsage> {
        Ok(self
            .book
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .usage(account))
    }
}

/// Ledger kept in a JSON file that several processes may share.
///
/// Every operation takes an exclusive lock on a sibling `.lock` file, reads
/// the ledger fresh from disk, applies its change to that copy and writes it
/// back before releasing the lock. Pending reservations are stored alongside
/// the committed counts so other processes see them at reserve time. Nothing
/// is cached between calls, so a failed write leaves the ledger as it was.
pub struct FileQuotaLedger {
    path: PathBuf,
    lock_path: PathBuf,
    // serializes callers sharing this instance; the file lock covers other handles
    local: Mutex<()>,
}

impl FileQuotaLedger {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let ledger = Self {
            lock_path: path.with_extension("json.lock"),
            path,
            local: Mutex::new(()),
        };

        // surface a corrupt ledger now rather than mid-run
        let accounts = ledger.transact(false, |book| Ok(book.accounts.len()))?;
        log::info!(
            "Opened quota ledger at {} ({} accounts)",
            ledger.path.display(),
            accounts
        );
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `apply` against the on-disk book while holding the ledger lock.
    /// With `write` set, the modified book is persisted before the lock drops.
    fn transact<R>(
        &self,
        write: bool,
        apply: impl FnOnce(&mut LedgerBook) -> Result<R>,
    ) -> Result<R> {
        let _local = self.local.lock().unwrap_or_else(|e| e.into_inner());
        let lock = self.acquire_lock()?;

        let mut book = self.load()?;
        let value = apply(&mut book)?;
        if write {
            self.persist(&book)?;
        }

        // closing the handle releases the lock
        drop(lock);
        Ok(value)
    }

    fn acquire_lock(&self) -> Result<File> {
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.lock_path)?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn load(&self) -> Result<LedgerBook> {
        if !self.path.exists() {
            return Ok(LedgerBook::default());
        }

        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(LedgerBook::default());
        }
        Ok(serde_json::from_str(&json)?)
    }

    /// Write to a sibling temp file and rename over the ledger
    fn persist(&self, book: &LedgerBook) -> Result<()> {
        let json = serde_json::to_string_pretty(book)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl QuotaLedger for FileQuotaLedger {
    fn reserve(
        &self,
        account: &str,
        tier: Tier,
        request: &GenerationRequest,
    ) -> Result<QuotaReservation> {
        self.transact(true, |book| book.reserve(account, tier, request))
    }

    fn commit(&self, reservation: QuotaReservation) -> Result<u32> {
        self.transact(true, |book| book.commit(&reservation))
    }

    fn release(&self, reservation: QuotaReservation) -> Result<()> {
        self.transact(true, |book| book.release(&reservation))
    }

    fn usage(&self, account: &str) -> Result<QuotaUsage> {
        self.transact(false, |book| {
            book.prune_stale(Utc::now());
            Ok(book.usage(account))
        })
    }
}
