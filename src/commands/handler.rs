//! Command Dispatcher
//!
//! Maps a parsed [`Request`] to a store operation and renders the outcome as
//! a [`RespValue`].
//!
//! ## Supported Commands
//!
//! ### Keys and Strings
//! - `SET key value [EX seconds | PX milliseconds]...` - Set a key
//! - `GET key` - Get a string value
//! - `DEL key` - Delete a key
//! - `EXISTS key` - Report `True` / `False`
//! - `GETDEL key` - Get a value and delete the key
//! - `INCR key` / `DECR key` - Add or subtract one
//! - `RENAME key newkey` / `RENAMENX key newkey` - Move a value
//! - `EXPIRE key seconds` / `PERSIST key` / `TTL key` - Manage expiry
//! - `KEYS` / `TYPE key` / `DBSIZE` / `FLUSHDB`
//!
//! ### Lists
//! - `LPUSH` / `RPUSH key value [value ...]`
//! - `LPOP` / `RPOP key`, `LLEN key`
//! - `LRANGE key start stop`, `LSET key index value`
//!
//! ### Hashes
//! - `HSET key field value`, `HGET key field`, `HDEL key field`
//! - `HGETALL` / `HKEYS` / `HVALS` / `HLEN key`
//!
//! ### Sorted Sets
//! - `ZADD key member:score [member:score ...]`
//! - `ZRANGE key start stop [WITHSCORES]`, `ZRANK key member`
//!
//! ## Error Replies
//!
//! Every failure is a [`crate::Error`] rendered as `-ERR <message>`. The
//! connection is never closed because of a failed command.

use crate::error::{Error, Result};
use crate::instance::InstanceHandle;
use crate::protocol::{parse, RespValue, Request};
use crate::storage::Value;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

/// Executes requests against the instance behind an [`InstanceHandle`].
///
/// Each command resolves the store through the handle, so every request
/// refreshes the instance's place in the LRU order.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    instance: InstanceHandle,
}

impl CommandHandler {
    pub fn new(instance: InstanceHandle) -> Self {
        Self { instance }
    }

    pub fn instance(&self) -> &InstanceHandle {
        &self.instance
    }

    /// Parses one complete request and executes it.
    ///
    /// Any parse failure, including a truncated frame, becomes
    /// `-ERR syntax error`.
    ///
    /// ```
    /// use stashkv::commands::CommandHandler;
    /// use stashkv::instance::{Config, InstanceCache, InstanceHandle};
    /// use stashkv::protocol::RespValue;
    /// use std::sync::Arc;
    ///
    /// let cache = Arc::new(InstanceCache::new());
    /// let handler = CommandHandler::new(InstanceHandle::new(cache, Config::default()));
    ///
    /// assert_eq!(handler.handle(b"SET name Ariz"), RespValue::ok());
    /// assert_eq!(handler.handle(b"GET name"), RespValue::bulk_string("Ariz"));
    /// ```
    pub fn handle(&self, buf: &[u8]) -> RespValue {
        match parse(buf) {
            Ok(request) => self.execute(request),
            Err(e) => {
                debug!(error = %e, "Rejected request");
                Error::Syntax.into()
            }
        }
    }

    /// Executes a parsed request. The command name is case-insensitive.
    pub fn execute(&self, request: Request) -> RespValue {
        let name = request.name.to_uppercase();

        match self.dispatch(&name, &request.args) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(command = %name, error = %e, "Command failed");
                e.into()
            }
        }
    }

    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> Result<RespValue> {
        match cmd {
            // Keys and strings
            "PING" => self.cmd_ping(args),
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "GETDEL" => self.cmd_getdel(args),
            "INCR" => self.cmd_incr(args),
            "DECR" => self.cmd_decr(args),
            "RENAME" => self.cmd_rename(args),
            "RENAMENX" => self.cmd_renamenx(args),
            "EXPIRE" => self.cmd_expire(args),
            "PERSIST" => self.cmd_persist(args),
            "TTL" => self.cmd_ttl(args),
            "KEYS" => self.cmd_keys(args),
            "TYPE" => self.cmd_type(args),
            "DBSIZE" => self.cmd_dbsize(args),
            "FLUSHDB" => self.cmd_flushdb(args),

            // Lists
            "LPUSH" => self.cmd_lpush(args),
            "RPUSH" => self.cmd_rpush(args),
            "LRANGE" => self.cmd_lrange(args),
            "LPOP" => self.cmd_lpop(args),
            "RPOP" => self.cmd_rpop(args),
            "LLEN" => self.cmd_llen(args),
            "LSET" => self.cmd_lset(args),

            // Hashes
            "HSET" => self.cmd_hset(args),
            "HGET" => self.cmd_hget(args),
            "HDEL" => self.cmd_hdel(args),
            "HGETALL" => self.cmd_hgetall(args),
            "HKEYS" => self.cmd_hkeys(args),
            "HVALS" => self.cmd_hvals(args),
            "HLEN" => self.cmd_hlen(args),

            // Sorted sets
            "ZADD" => self.cmd_zadd(args),
            "ZRANGE" => self.cmd_zrange(args),
            "ZRANK" => self.cmd_zrank(args),

            _ => Err(Error::UnknownCommand(cmd.to_string())),
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn arity(args: &[Bytes], expected: usize, name: &'static str) -> Result<()> {
        if args.len() != expected {
            return Err(Error::WrongArity(name));
        }
        Ok(())
    }

    fn min_arity(args: &[Bytes], min: usize, name: &'static str) -> Result<()> {
        if args.len() < min {
            return Err(Error::WrongArity(name));
        }
        Ok(())
    }

    fn parse_int(arg: &[u8]) -> Result<i64> {
        std::str::from_utf8(arg)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::InvalidFormat)
    }

    /// A positive whole number of time units.
    fn parse_duration(arg: &[u8], unit: fn(u64) -> Duration) -> Result<Duration> {
        match Self::parse_int(arg)? {
            n if n > 0 => Ok(unit(n as u64)),
            _ => Err(Error::InvalidFormat),
        }
    }

    /// Splits `member:score` at the last colon. The member must be non-empty.
    fn parse_scored_member(arg: &Bytes) -> Result<(Bytes, f64)> {
        let colon = arg
            .iter()
            .rposition(|&b| b == b':')
            .filter(|&colon| colon > 0)
            .ok_or(Error::Syntax)?;

        let score: f64 = std::str::from_utf8(&arg[colon + 1..])
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|score: &f64| !score.is_nan())
            .ok_or(Error::InvalidFormat)?;

        Ok((arg.slice(..colon), score))
    }

    fn bulk_or_null(value: Option<Value>) -> RespValue {
        value.map_or_else(RespValue::null, RespValue::from)
    }

    fn status(flag: bool) -> RespValue {
        RespValue::integer(flag as i64)
    }

    // ========================================================================
    // Keys and strings
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> Result<RespValue> {
        match args {
            [] => Ok(RespValue::pong()),
            [message] => Ok(RespValue::bulk_string(message.clone())),
            _ => Err(Error::WrongArity("PING")),
        }
    }

    /// SET key value [EX seconds | PX milliseconds]...
    ///
    /// Modifiers may repeat; the last one wins.
    fn cmd_set(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::min_arity(args, 2, "SET")?;

        let mut ttl = None;
        let mut options = args[2..].iter();
        while let Some(opt) = options.next() {
            let amount = options.next().ok_or(Error::Syntax)?;
            ttl = Some(match opt.to_ascii_uppercase().as_slice() {
                b"EX" => Self::parse_duration(amount, Duration::from_secs)?,
                b"PX" => Self::parse_duration(amount, Duration::from_millis)?,
                _ => return Err(Error::Syntax),
            });
        }

        let store = self.instance.store();
        let key = args[0].clone();
        let value = Value::from(args[1].clone());
        match ttl {
            Some(ttl) => store.set_with_expiry(key, value, ttl)?,
            None => store.set(key, value),
        }
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "GET")?;

        let value = self
            .instance
            .store()
            .get(&args[0])
            .ok_or_else(|| Error::not_found(&args[0]))?;
        Ok(RespValue::bulk_string(value.as_scalar()?.to_bytes()))
    }

    /// DEL key
    fn cmd_del(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "DEL")?;

        if !self.instance.store().delete(&args[0]) {
            return Err(Error::not_found(&args[0]));
        }
        Ok(RespValue::simple_string("The key has been deleted"))
    }

    /// EXISTS key
    fn cmd_exists(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "EXISTS")?;

        let exists = self.instance.store().exists(&args[0]);
        Ok(RespValue::simple_string(if exists { "True" } else { "False" }))
    }

    /// GETDEL key
    fn cmd_getdel(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "GETDEL")?;

        self.instance
            .store()
            .get_and_delete(&args[0])
            .map(RespValue::from)
            .ok_or_else(|| Error::not_found(&args[0]))
    }

    /// INCR key
    fn cmd_incr(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "INCR")?;
        Ok(RespValue::integer(self.instance.store().incr(args[0].clone())?))
    }

    /// DECR key
    fn cmd_decr(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "DECR")?;
        Ok(RespValue::integer(self.instance.store().decr(args[0].clone())?))
    }

    /// RENAME key newkey
    fn cmd_rename(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "RENAME")?;

        self.instance.store().rename(&args[0], args[1].clone())?;
        Ok(RespValue::ok())
    }

    /// RENAMENX key newkey
    fn cmd_renamenx(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "RENAMENX")?;

        match self.instance.store().rename_nx(&args[0], args[1].clone()) {
            Ok(()) => Ok(RespValue::integer(1)),
            Err(Error::AlreadyExists(_)) => Ok(RespValue::integer(0)),
            Err(e) => Err(e),
        }
    }

    /// EXPIRE key seconds
    fn cmd_expire(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "EXPIRE")?;

        let secs = u64::try_from(Self::parse_int(&args[1])?).map_err(|_| Error::InvalidFormat)?;
        self.instance
            .store()
            .expire(&args[0], Duration::from_secs(secs))?;
        Ok(RespValue::ok())
    }

    /// PERSIST key
    fn cmd_persist(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "PERSIST")?;
        Ok(Self::status(self.instance.store().persist(&args[0])?))
    }

    /// TTL key
    ///
    /// `0` means the key never expires, `-2` that it does not exist.
    fn cmd_ttl(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "TTL")?;

        let secs = self.instance.store().ttl(&args[0]).map_or(-2, |ttl| ttl.as_secs());
        Ok(RespValue::integer(secs))
    }

    /// KEYS
    fn cmd_keys(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 0, "KEYS")?;

        let mut keys = self.instance.store().keys();
        keys.sort();
        Ok(RespValue::array(
            keys.into_iter().map(RespValue::bulk_string).collect(),
        ))
    }

    /// TYPE key
    fn cmd_type(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "TYPE")?;

        let name = self.instance.store().key_type(&args[0]).unwrap_or("none");
        Ok(RespValue::simple_string(name))
    }

    /// DBSIZE
    fn cmd_dbsize(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 0, "DBSIZE")?;
        Ok(RespValue::integer(self.instance.store().len() as i64))
    }

    /// FLUSHDB
    fn cmd_flushdb(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 0, "FLUSHDB")?;
        self.instance.store().flush();
        Ok(RespValue::ok())
    }

    // ========================================================================
    // Lists
    // ========================================================================

    /// LPUSH key value [value ...]
    fn cmd_lpush(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::min_arity(args, 2, "LPUSH")?;

        let values = args[1..].iter().cloned().map(Value::from).collect();
        let len = self.instance.store().lpush(args[0].clone(), values)?;
        Ok(RespValue::integer(len as i64))
    }

    /// RPUSH key value [value ...]
    fn cmd_rpush(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::min_arity(args, 2, "RPUSH")?;

        let values = args[1..].iter().cloned().map(Value::from).collect();
        let len = self.instance.store().rpush(args[0].clone(), values)?;
        Ok(RespValue::integer(len as i64))
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 3, "LRANGE")?;

        let start = Self::parse_int(&args[1])?;
        let stop = Self::parse_int(&args[2])?;
        let items = self.instance.store().lrange(&args[0], start, stop)?;
        Ok(RespValue::array(items.into_iter().map(RespValue::from).collect()))
    }

    /// LPOP key
    fn cmd_lpop(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "LPOP")?;
        Ok(Self::bulk_or_null(self.instance.store().lpop(&args[0])?))
    }

    /// RPOP key
    fn cmd_rpop(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "RPOP")?;
        Ok(Self::bulk_or_null(self.instance.store().rpop(&args[0])?))
    }

    /// LLEN key
    fn cmd_llen(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "LLEN")?;
        Ok(RespValue::integer(self.instance.store().llen(&args[0])? as i64))
    }

    /// LSET key index value
    fn cmd_lset(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 3, "LSET")?;

        let index = Self::parse_int(&args[1])?;
        self.instance
            .store()
            .lset(&args[0], index, Value::from(args[2].clone()))?;
        Ok(RespValue::ok())
    }

    // ========================================================================
    // Hashes
    // ========================================================================

    /// HSET key field value
    fn cmd_hset(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 3, "HSET")?;

        let created = self.instance.store().hset(
            args[0].clone(),
            args[1].clone(),
            Value::from(args[2].clone()),
        )?;
        Ok(Self::status(created))
    }

    /// HGET key field
    fn cmd_hget(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "HGET")?;
        Ok(Self::bulk_or_null(
            self.instance.store().hget(&args[0], &args[1])?,
        ))
    }

    /// HDEL key field
    fn cmd_hdel(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "HDEL")?;
        Ok(Self::status(self.instance.store().hdel(&args[0], &args[1])?))
    }

    /// HGETALL key
    fn cmd_hgetall(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "HGETALL")?;

        Ok(match self.instance.store().hgetall(&args[0])? {
            Some(fields) => RespValue::from(Value::Hash(fields)),
            None => RespValue::array(vec![]),
        })
    }

    /// HKEYS key
    fn cmd_hkeys(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "HKEYS")?;

        let fields = self.instance.store().hkeys(&args[0])?.unwrap_or_default();
        Ok(RespValue::array(
            fields.into_iter().map(RespValue::bulk_string).collect(),
        ))
    }

    /// HVALS key
    fn cmd_hvals(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "HVALS")?;

        let values = self.instance.store().hvals(&args[0])?.unwrap_or_default();
        Ok(RespValue::array(values.into_iter().map(RespValue::from).collect()))
    }

    /// HLEN key
    fn cmd_hlen(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 1, "HLEN")?;

        let len = self.instance.store().hlen(&args[0])?.unwrap_or(0);
        Ok(RespValue::integer(len as i64))
    }

    // ========================================================================
    // Sorted sets
    // ========================================================================

    /// ZADD key member:score [member:score ...]
    fn cmd_zadd(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::min_arity(args, 2, "ZADD")?;

        let members = args[1..]
            .iter()
            .map(Self::parse_scored_member)
            .collect::<Result<Vec<_>>>()?;
        let inserted = self.instance.store().zadd(args[0].clone(), members)?;
        Ok(RespValue::integer(inserted as i64))
    }

    /// ZRANGE key start stop [WITHSCORES]
    fn cmd_zrange(&self, args: &[Bytes]) -> Result<RespValue> {
        if !(3..=4).contains(&args.len()) {
            return Err(Error::WrongArity("ZRANGE"));
        }

        let with_scores = match args.get(3) {
            Some(flag) if flag.eq_ignore_ascii_case(b"WITHSCORES") => true,
            Some(_) => return Err(Error::Syntax),
            None => false,
        };
        let start = Self::parse_int(&args[1])?;
        let stop = Self::parse_int(&args[2])?;

        let items = self
            .instance
            .store()
            .zrange(&args[0], start, stop, with_scores)?;
        Ok(RespValue::array(items.into_iter().map(RespValue::from).collect()))
    }

    /// ZRANK key member
    fn cmd_zrank(&self, args: &[Bytes]) -> Result<RespValue> {
        Self::arity(args, 2, "ZRANK")?;

        Ok(match self.instance.store().zrank(&args[0], &args[1])? {
            Some(rank) => RespValue::integer(rank as i64),
            None => RespValue::null(),
        })
    }
}
