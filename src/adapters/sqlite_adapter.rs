//! SQLite persistence for minute bars and the trade history.

use crate::domain::bar::{Bar, BarSeries, TIMESTAMP_FORMAT};
use crate::domain::error::TraderError;
use crate::domain::trade::{TradeRecord, TradeType};
use crate::ports::bar_feed_port::BarFeed;
use crate::ports::config_port::ConfigPort;
use crate::ports::trade_history_port::TradeHistory;
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Row};

const TRADE_COLUMNS: &str =
    "trade_type, price, amount, roi, executed_at, is_simulated, seed_balance_after";

fn query_err(e: rusqlite::Error) -> TraderError {
    TraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn parse_timestamp(idx: usize, text: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<Bar> {
    Ok(Bar {
        timestamp: parse_timestamp(0, row.get(0)?)?,
        open: row.get(1)?,
        high: row.get(2)?,
        low: row.get(3)?,
        close: row.get(4)?,
        volume: row.get(5)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<TradeRecord> {
    let kind: String = row.get(0)?;
    let trade_type = kind.parse::<TradeType>().map_err(|reason| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(reason)),
        )
    })?;
    Ok(TradeRecord {
        trade_type,
        price: row.get(1)?,
        amount: row.get(2)?,
        roi: row.get(3)?,
        executed_at: parse_timestamp(4, row.get(4)?)?,
        is_simulated: row.get(5)?,
        seed_balance_after: row.get(6)?,
    })
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| TraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| TraderError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, TraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| TraderError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, TraderError> {
        self.pool.get().map_err(|e: r2d2::Error| TraderError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), TraderError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS bars (
                    timestamp TEXT PRIMARY KEY,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume REAL NOT NULL
                );
                CREATE TABLE IF NOT EXISTS trade_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    trade_type TEXT NOT NULL CHECK (trade_type IN ('buy', 'sell')),
                    price REAL NOT NULL,
                    amount REAL NOT NULL,
                    roi REAL,
                    executed_at TEXT NOT NULL,
                    is_simulated INTEGER NOT NULL,
                    seed_balance_after REAL NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_trade_history_type ON trade_history(trade_type, id);",
            )
            .map_err(query_err)
    }

    /// Insert-if-absent keyed by timestamp. Returns how many bars were new.
    pub fn insert_bars(&self, bars: &[Bar]) -> Result<usize, TraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let mut inserted = 0;
        for bar in bars {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO bars (timestamp, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                        bar.open,
                        bar.high,
                        bar.low,
                        bar.close,
                        bar.volume
                    ],
                )
                .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    /// First and last bar timestamps and the bar count, if any bars exist.
    pub fn bar_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, TraderError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM bars",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                let parse = |s: &str| {
                    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(
                        |e: chrono::ParseError| TraderError::Database {
                            reason: e.to_string(),
                        },
                    )
                };
                Ok(Some((parse(&min)?, parse(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }

    fn query_trades(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<TradeRecord>, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(query_err)?;
        let rows = stmt.query_map(params, trade_from_row).map_err(query_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(query_err)?);
        }
        Ok(records)
    }
}

impl BarFeed for SqliteAdapter {
    fn recent_bars(&self, n: usize) -> Result<BarSeries, TraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, open, high, low, close, volume
                 FROM bars
                 ORDER BY timestamp DESC
                 LIMIT ?1",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![n as i64], bar_from_row)
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }
        Ok(BarSeries::from_bars(bars))
    }
}

impl TradeHistory for SqliteAdapter {
    fn append_record(&self, record: &TradeRecord) -> Result<(), TraderError> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO trade_history ({TRADE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    record.trade_type.as_str(),
                    record.price,
                    record.amount,
                    record.roi,
                    record.executed_at.format(TIMESTAMP_FORMAT).to_string(),
                    record.is_simulated,
                    record.seed_balance_after
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn latest_record(&self) -> Result<Option<TradeRecord>, TraderError> {
        let mut records = self.query_trades(
            &format!("SELECT {TRADE_COLUMNS} FROM trade_history ORDER BY id DESC LIMIT 1"),
            [],
        )?;
        Ok(records.pop())
    }

    fn latest_record_of_type(
        &self,
        trade_type: TradeType,
    ) -> Result<Option<TradeRecord>, TraderError> {
        let mut records = self.query_trades(
            &format!(
                "SELECT {TRADE_COLUMNS} FROM trade_history
                 WHERE trade_type = ?1 ORDER BY id DESC LIMIT 1"
            ),
            params![trade_type.as_str()],
        )?;
        Ok(records.pop())
    }

    fn records(&self) -> Result<Vec<TradeRecord>, TraderError> {
        self.query_trades(
            &format!("SELECT {TRADE_COLUMNS} FROM trade_history ORDER BY id ASC"),
            [],
        )
    }
}
