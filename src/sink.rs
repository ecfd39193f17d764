use crate::error::Error;
use crate::recorder::SpeedRecord;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS vehicles (timestamp REAL, track_id INTEGER, speed REAL);";
const INSERT: &str = "INSERT INTO vehicles (timestamp, track_id, speed) VALUES (?1, ?2, ?3)";

/// Destination for per-frame speed batches. One call is one unit of work and
/// must be applied entirely or not at all.
pub trait RecordSink {
    fn write_batch(&mut self, records: &[SpeedRecord]) -> Result<(), Error>;
}

/// Append-only `vehicles` table in an SQLite database.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(CREATE_TABLE)?;
        Ok(Self { conn })
    }

    pub fn count(&self) -> Result<usize, Error> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;

        Ok(n as usize)
    }

    /// Every stored row in insertion order.
    pub fn records(&self) -> Result<Vec<SpeedRecord>, Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT timestamp, track_id, speed FROM vehicles ORDER BY rowid")?;

        let rows = stmt.query_map([], |row| {
            Ok(SpeedRecord {
                timestamp: row.get(0)?,
                track_id: row.get::<_, i64>(1)? as u64,
                speed: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }
}

impl RecordSink for SqliteSink {
    fn write_batch(&mut self, records: &[SpeedRecord]) -> Result<(), Error> {
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare_cached(INSERT)?;
            for r in records {
                stmt.execute(params![r.timestamp, r.track_id as i64, r.speed])?;
            }
        }

        tx.commit()?;

        Ok(())
    }
}

/// Keeps committed batches in memory. Clones share the same storage, so a
/// handle kept by the caller sees what a boxed clone receives.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<SpeedRecord>>>>,
}

impl MemorySink {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Vec<SpeedRecord>> {
        self.batches.lock().clone()
    }

    pub fn records(&self) -> Vec<SpeedRecord> {
        self.batches.lock().iter().flatten().copied().collect()
    }
}

impl RecordSink for MemorySink {
    fn write_batch(&mut self, records: &[SpeedRecord]) -> Result<(), Error> {
        self.batches.lock().push(records.to_vec());
        Ok(())
    }
}
