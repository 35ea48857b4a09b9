use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::{env, result};

use lazy_static::lazy_static;

pub type Res<T> = Result<T, String>;

pub trait ErrToStr<T, E: Display> {
    fn err_to_str(self) -> Res<T>;
}

impl<T, E: Display> ErrToStr<T, E> for result::Result<T, E> {
    fn err_to_str(self) -> Res<T> {
        self.map_err(|err| err.to_string())
    }
}

#[derive(strum_macros::Display, Eq, PartialEq, Debug, Hash, Clone, Copy)]
pub enum DbgFlg {
    #[strum(serialize = "DBG_FLG_DRAFT")]
    Draft,
    #[strum(serialize = "DBG_FLG_API")]
    Api,
    #[strum(serialize = "DBG_FLG_SYNERGY")]
    Synergy,
    #[strum(serialize = "DBG_FLG_CLI")]
    Cli,
}

lazy_static! {
    pub static ref DBG_FLG_DEFAULTS: HashMap<DbgFlg, bool> = HashMap::from([
        (DbgFlg::Draft, false),
        (DbgFlg::Api, false),
        (DbgFlg::Synergy, false),
        (DbgFlg::Cli, false),
    ]);
}

pub trait DebugIf: Debug {
    fn dbg_if(&self, flg: DbgFlg);
}

impl<T: Debug> DebugIf for T {
    fn dbg_if(&self, flg: DbgFlg)
    where
        Self: Debug,
    {
        if checkflag(&flg) {
            dbg!(self);
        }
    }
}

pub fn log_if(s: &str, flg: DbgFlg) {
    if checkflag(&flg) {
        println!("{} [{}] {}", utc_now(), flg, s);
    }
}

fn utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn checkflag(flag: &DbgFlg) -> bool {
    env::var(flag.to_string()).ok().map_or_else(
        || DBG_FLG_DEFAULTS.get(flag).copied().unwrap_or(false),
        |s| s == "1" || s == "true",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_env_names() {
        assert_eq!(DbgFlg::Draft.to_string(), "DBG_FLG_DRAFT");
        assert_eq!(DbgFlg::Synergy.to_string(), "DBG_FLG_SYNERGY");
    }

    #[test]
    fn test_err_to_str() {
        let parsed: Res<u8> = "300".parse::<u8>().err_to_str();
        assert!(parsed.is_err());
        assert_eq!("7".parse::<u8>().err_to_str(), Ok(7));
    }

    #[test]
    fn test_checkflag_reads_env() {
        env::set_var(DbgFlg::Cli.to_string(), "1");
        assert!(checkflag(&DbgFlg::Cli));
        env::set_var(DbgFlg::Cli.to_string(), "0");
        assert!(!checkflag(&DbgFlg::Cli));
        env::remove_var(DbgFlg::Cli.to_string());
    }
}
