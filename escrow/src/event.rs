//! Append-only event log shared by the factory and every escrow it creates.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use timelock_types::{Address, Amount, EscrowId, Timestamp};

/// Records emitted by successful escrow and factory operations.
///
/// Failed operations never emit. Serialized externally tagged
/// (`{"deposit":{..}}`) so amounts keep their full `u128` range in JSON.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowEvent {
    /// The one-time deposit was received into custody.
    Deposit {
        escrow: EscrowId,
        sender: Address,
        amount: Amount,
    },
    /// The beneficiary claimed the deposit after expiration.
    Withdraw {
        escrow: EscrowId,
        beneficiary: Address,
        amount: Amount,
    },
    BeneficiaryChanged {
        escrow: EscrowId,
        old: Address,
        new: Address,
    },
    /// The trustor took the deposit back before expiration.
    Revoked {
        escrow: EscrowId,
        trustor: Address,
        amount: Amount,
    },
    ExpirationChanged {
        escrow: EscrowId,
        old: Timestamp,
        new: Timestamp,
    },
    /// The factory created and funded a new escrow.
    NewTrust {
        trustor: Address,
        beneficiary: Address,
        escrow: EscrowId,
        amount: Amount,
    },
}

impl EscrowEvent {
    /// The escrow this record concerns.
    pub fn escrow(&self) -> EscrowId {
        match self {
            EscrowEvent::Deposit { escrow, .. }
            | EscrowEvent::Withdraw { escrow, .. }
            | EscrowEvent::BeneficiaryChanged { escrow, .. }
            | EscrowEvent::Revoked { escrow, .. }
            | EscrowEvent::ExpirationChanged { escrow, .. }
            | EscrowEvent::NewTrust { escrow, .. } => *escrow,
        }
    }
}

/// An event together with its position in the log and emission time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub at: Timestamp,
    pub event: EscrowEvent,
}

type Listener = Box<dyn Fn(&EventRecord) + Send + Sync>;

/// Append-only, queryable log of [`EscrowEvent`]s with synchronous fan-out.
///
/// Listeners are invoked inline on the appending thread while the emitting
/// escrow and the log itself are locked; they must be fast and must neither
/// append nor query the log.
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
    listeners: Mutex<Vec<Listener>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    /// Rebuild a log from previously exported records.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        lock(&self.listeners).push(listener);
    }

    /// Append an event and notify listeners. Returns the stored record.
    ///
    /// Listeners run before the records lock is released, so they observe
    /// records in `seq` order even under concurrent appends.
    pub fn append(&self, at: Timestamp, event: EscrowEvent) -> EventRecord {
        let mut records = lock(&self.records);
        let record = EventRecord {
            seq: records.len() as u64,
            at,
            event,
        };
        records.push(record.clone());
        for listener in lock(&self.listeners).iter() {
            listener(&record);
        }
        record
    }

    pub fn records(&self) -> Vec<EventRecord> {
        lock(&self.records).clone()
    }

    pub fn records_for(&self, escrow: EscrowId) -> Vec<EventRecord> {
        lock(&self.records)
            .iter()
            .filter(|r| r.event.escrow() == escrow)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export as newline-delimited JSON, one record per line.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for record in lock(&self.records).iter() {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse newline-delimited JSON produced by [`EventLog::to_json_lines`].
    pub fn from_json_lines(input: &str) -> Result<Self, serde_json::Error> {
        let records = input
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<EventRecord>, _>>()?;
        Ok(Self::from_records(records))
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

// The log is append-only, so a panic in another holder cannot leave it torn.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn deposit(id: u64, amount: u128) -> EscrowEvent {
        EscrowEvent::Deposit {
            escrow: EscrowId::new(id),
            sender: Address::new("alice"),
            amount: Amount::new(amount),
        }
    }

    #[test]
    fn append_assigns_sequential_numbers() {
        let log = EventLog::new();
        let a = log.append(Timestamp::new(1), deposit(1, 10));
        let b = log.append(Timestamp::new(2), deposit(2, 20));
        assert_eq!(a.seq, 0);
        assert_eq!(b.seq, 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn records_for_filters_by_escrow() {
        let log = EventLog::new();
        log.append(Timestamp::new(1), deposit(1, 10));
        log.append(Timestamp::new(2), deposit(2, 20));
        log.append(
            Timestamp::new(3),
            EscrowEvent::Revoked {
                escrow: EscrowId::new(1),
                trustor: Address::new("alice"),
                amount: Amount::new(10),
            },
        );
        let first = log.records_for(EscrowId::new(1));
        assert_eq!(first.len(), 2);
        assert!(matches!(first[1].event, EscrowEvent::Revoked { .. }));
    }

    #[test]
    fn listeners_see_every_append() {
        let counter = Arc::new(AtomicUsize::new(0));
        let log = EventLog::new();
        let c = Arc::clone(&counter);
        log.subscribe(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        log.append(Timestamp::new(1), deposit(1, 10));
        log.append(Timestamp::new(1), deposit(2, 10));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn json_lines_export_and_reload() {
        let log = EventLog::new();
        log.append(Timestamp::new(5), deposit(1, 10));
        log.append(
            Timestamp::new(6),
            EscrowEvent::ExpirationChanged {
                escrow: EscrowId::new(1),
                old: Timestamp::new(100),
                new: Timestamp::new(200),
            },
        );
        let text = log.to_json_lines().unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("\"expiration_changed\":{"));

        let reloaded = EventLog::from_json_lines(&text).unwrap();
        assert_eq!(reloaded.records(), log.records());
    }

    #[test]
    fn json_lines_keep_full_amount_range() {
        let log = EventLog::new();
        log.append(Timestamp::new(1), deposit(1, u128::MAX));
        log.append(
            Timestamp::new(2),
            EscrowEvent::NewTrust {
                trustor: Address::new("alice"),
                beneficiary: Address::new("bob"),
                escrow: EscrowId::new(1),
                amount: Amount::new(u128::MAX),
            },
        );
        log.append(
            Timestamp::new(3),
            EscrowEvent::Withdraw {
                escrow: EscrowId::new(1),
                beneficiary: Address::new("bob"),
                amount: Amount::new(1),
            },
        );
        let text = log.to_json_lines().unwrap();
        let reloaded = EventLog::from_json_lines(&text).unwrap();
        assert_eq!(reloaded.records(), log.records());
        assert_eq!(reloaded.records()[0].event, deposit(1, u128::MAX));
    }

    #[test]
    fn listeners_observe_sequence_order_under_concurrent_appends() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::new(EventLog::new());
        let sink = Arc::clone(&seen);
        log.subscribe(Box::new(move |record| {
            sink.lock().unwrap().push(record.seq);
        }));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        log.append(Timestamp::new(i), deposit(t, 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 400);
        assert!(seen.windows(2).all(|w| w[0] + 1 == w[1]));
    }

    #[test]
    fn default_creates_empty_log() {
        assert!(EventLog::default().is_empty());
    }
}
