//! Parser for `/proc/<pid>/stat` records.
//!
//! The record is `pid (comm) state ppid ...`, one line of space-separated
//! fields. `comm` may contain spaces and parentheses, so it is bounded by the
//! first `(` and the last `)`. Everything after it follows a fixed positional
//! layout that grew over kernel revisions; `LAYOUT` lists every position in
//! order, including the ones that are read and thrown away.

use serde::Serialize;
use std::str::FromStr;

use super::error::ParseError;

/// Per-task flag set for kernel threads (`PF_KTHREAD`).
pub const PF_KTHREAD: u32 = 0x0020_0000;

/// Typed content of one stat record.
///
/// Fields appended by later kernels start from the values older kernels
/// imply: `processor` 0, `rt_priority` and `policy` -1 (unset).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRecord {
    pub name: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: i32,
    pub tpgid: i32,
    pub flags: u32,
    pub min_flt: u64,
    pub cmin_flt: u64,
    pub maj_flt: u64,
    pub cmaj_flt: u64,
    pub utime: u64,
    pub stime: u64,
    pub cutime: u64,
    pub cstime: u64,
    pub priority: i32,
    pub nice: i32,
    pub num_threads: i32,
    /// Obsolete interval timer, always 0 on current kernels.
    pub itrealvalue: i64,
    /// Start time in clock ticks since boot.
    pub starttime: u64,
    pub vsize: u64,
    pub rss: u64,
    pub rsslim: u64,
    pub start_code: u64,
    pub end_code: u64,
    pub start_stack: u64,
    pub kstk_esp: u64,
    pub kstk_eip: u64,
    /// Former wait channel address. Holds its position only.
    pub wchan: u64,
    pub exit_signal: i32,
    pub processor: i32,
    pub rt_priority: i32,
    pub policy: i32,
    pub delayacct_blkio_ticks: u64,
    pub guest_time: u64,
    pub cguest_time: u64,
}

impl Default for StatRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            state: '?',
            ppid: 0,
            pgrp: 0,
            session: 0,
            tty_nr: 0,
            tpgid: 0,
            flags: 0,
            min_flt: 0,
            cmin_flt: 0,
            maj_flt: 0,
            cmaj_flt: 0,
            utime: 0,
            stime: 0,
            cutime: 0,
            cstime: 0,
            priority: 0,
            nice: 0,
            num_threads: 0,
            itrealvalue: 0,
            starttime: 0,
            vsize: 0,
            rss: 0,
            rsslim: 0,
            start_code: 0,
            end_code: 0,
            start_stack: 0,
            kstk_esp: 0,
            kstk_eip: 0,
            wchan: 0,
            exit_signal: 0,
            processor: 0,
            rt_priority: -1,
            policy: -1,
            delayacct_blkio_ticks: 0,
            guest_time: 0,
            cguest_time: 0,
        }
    }
}

impl StatRecord {
    /// User plus kernel mode ticks.
    pub fn cpu_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }

    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }
}

/// One position of the stat layout after `comm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    State,
    Ppid,
    Pgrp,
    Session,
    TtyNr,
    Tpgid,
    Flags,
    MinFlt,
    CminFlt,
    MajFlt,
    CmajFlt,
    Utime,
    Stime,
    Cutime,
    Cstime,
    Priority,
    Nice,
    NumThreads,
    ItRealValue,
    StartTime,
    Vsize,
    Rss,
    RssLim,
    StartCode,
    EndCode,
    StartStack,
    KstkEsp,
    KstkEip,
    /// Present in the record, never stored.
    Discard(&'static str),
    Wchan,
    ExitSignal,
    Processor,
    RtPriority,
    Policy,
    BlkioTicks,
    GuestTime,
    CguestTime,
}

/// Whether a record may end before a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    /// Added after the scheduling fields; older records may stop here.
    Trailing,
}

use Presence::{Required, Trailing};

const LAYOUT: &[(Slot, Presence)] = &[
    (Slot::State, Required),
    (Slot::Ppid, Required),
    (Slot::Pgrp, Required),
    (Slot::Session, Required),
    (Slot::TtyNr, Required),
    (Slot::Tpgid, Required),
    (Slot::Flags, Required),
    (Slot::MinFlt, Required),
    (Slot::CminFlt, Required),
    (Slot::MajFlt, Required),
    (Slot::CmajFlt, Required),
    (Slot::Utime, Required),
    (Slot::Stime, Required),
    (Slot::Cutime, Required),
    (Slot::Cstime, Required),
    (Slot::Priority, Required),
    (Slot::Nice, Required),
    (Slot::NumThreads, Required),
    (Slot::ItRealValue, Required),
    (Slot::StartTime, Required),
    (Slot::Vsize, Required),
    (Slot::Rss, Required),
    (Slot::RssLim, Required),
    (Slot::StartCode, Required),
    (Slot::EndCode, Required),
    (Slot::StartStack, Required),
    (Slot::KstkEsp, Required),
    (Slot::KstkEip, Required),
    // Signal bitmaps are obsolete in this file; /proc/<pid>/status has them.
    (Slot::Discard("signal"), Required),
    (Slot::Discard("blocked"), Required),
    (Slot::Discard("sigignore"), Required),
    (Slot::Discard("sigcatch"), Required),
    (Slot::Wchan, Required),
    // Swap counters are no longer maintained (always 0 since 2.4).
    (Slot::Discard("nswap"), Required),
    (Slot::Discard("cnswap"), Required),
    (Slot::ExitSignal, Required),
    // 2.2.8
    (Slot::Processor, Required),
    // 2.5.19
    (Slot::RtPriority, Required),
    (Slot::Policy, Required),
    // 2.6.18
    (Slot::BlkioTicks, Trailing),
    // 2.6.24
    (Slot::GuestTime, Trailing),
    (Slot::CguestTime, Trailing),
];

impl Slot {
    fn name(self) -> &'static str {
        match self {
            Slot::State => "state",
            Slot::Ppid => "ppid",
            Slot::Pgrp => "pgrp",
            Slot::Session => "session",
            Slot::TtyNr => "tty_nr",
            Slot::Tpgid => "tpgid",
            Slot::Flags => "flags",
            Slot::MinFlt => "minflt",
            Slot::CminFlt => "cminflt",
            Slot::MajFlt => "majflt",
            Slot::CmajFlt => "cmajflt",
            Slot::Utime => "utime",
            Slot::Stime => "stime",
            Slot::Cutime => "cutime",
            Slot::Cstime => "cstime",
            Slot::Priority => "priority",
            Slot::Nice => "nice",
            Slot::NumThreads => "num_threads",
            Slot::ItRealValue => "itrealvalue",
            Slot::StartTime => "starttime",
            Slot::Vsize => "vsize",
            Slot::Rss => "rss",
            Slot::RssLim => "rsslim",
            Slot::StartCode => "startcode",
            Slot::EndCode => "endcode",
            Slot::StartStack => "startstack",
            Slot::KstkEsp => "kstkesp",
            Slot::KstkEip => "kstkeip",
            Slot::Discard(name) => name,
            Slot::Wchan => "wchan",
            Slot::ExitSignal => "exit_signal",
            Slot::Processor => "processor",
            Slot::RtPriority => "rt_priority",
            Slot::Policy => "policy",
            Slot::BlkioTicks => "delayacct_blkio_ticks",
            Slot::GuestTime => "guest_time",
            Slot::CguestTime => "cguest_time",
        }
    }

    fn store(self, rec: &mut StatRecord, tok: &str) -> Result<(), ParseError> {
        match self {
            Slot::State => rec.state = tok.chars().next().unwrap_or('?'),
            Slot::Ppid => rec.ppid = self.value(tok)?,
            Slot::Pgrp => rec.pgrp = self.value(tok)?,
            Slot::Session => rec.session = self.value(tok)?,
            Slot::TtyNr => rec.tty_nr = self.value(tok)?,
            Slot::Tpgid => rec.tpgid = self.value(tok)?,
            Slot::Flags => rec.flags = self.value(tok)?,
            Slot::MinFlt => rec.min_flt = self.value(tok)?,
            Slot::CminFlt => rec.cmin_flt = self.value(tok)?,
            Slot::MajFlt => rec.maj_flt = self.value(tok)?,
            Slot::CmajFlt => rec.cmaj_flt = self.value(tok)?,
            Slot::Utime => rec.utime = self.value(tok)?,
            Slot::Stime => rec.stime = self.value(tok)?,
            Slot::Cutime => rec.cutime = self.value(tok)?,
            Slot::Cstime => rec.cstime = self.value(tok)?,
            Slot::Priority => rec.priority = self.value(tok)?,
            Slot::Nice => rec.nice = self.value(tok)?,
            Slot::NumThreads => rec.num_threads = self.value(tok)?,
            Slot::ItRealValue => rec.itrealvalue = self.value(tok)?,
            Slot::StartTime => rec.starttime = self.value(tok)?,
            Slot::Vsize => rec.vsize = self.value(tok)?,
            Slot::Rss => rec.rss = self.value(tok)?,
            Slot::RssLim => rec.rsslim = self.value(tok)?,
            Slot::StartCode => rec.start_code = self.value(tok)?,
            Slot::EndCode => rec.end_code = self.value(tok)?,
            Slot::StartStack => rec.start_stack = self.value(tok)?,
            Slot::KstkEsp => rec.kstk_esp = self.value(tok)?,
            Slot::KstkEip => rec.kstk_eip = self.value(tok)?,
            Slot::Discard(_) => {}
            Slot::Wchan => rec.wchan = self.value(tok)?,
            Slot::ExitSignal => rec.exit_signal = self.value(tok)?,
            Slot::Processor => rec.processor = self.value(tok)?,
            Slot::RtPriority => rec.rt_priority = self.value(tok)?,
            Slot::Policy => rec.policy = self.value(tok)?,
            Slot::BlkioTicks => rec.delayacct_blkio_ticks = self.value(tok)?,
            Slot::GuestTime => rec.guest_time = self.value(tok)?,
            Slot::CguestTime => rec.cguest_time = self.value(tok)?,
        }
        Ok(())
    }

    fn value<T: FromStr>(self, tok: &str) -> Result<T, ParseError> {
        tok.parse().map_err(|_| ParseError::InvalidField {
            field: self.name(),
            value: tok.to_string(),
        })
    }
}

/// Parses a stat record into `rec`, slot by slot.
///
/// Fields are written as they are read; on error the ones before the
/// failing slot keep their new values. Kernel threads get their name wrapped
/// in brackets once the whole record parsed.
pub fn parse_stat_into(buf: &str, rec: &mut StatRecord) -> Result<(), ParseError> {
    let open = buf.find('(').ok_or(ParseError::MissingName)?;
    let close = buf
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or(ParseError::MissingName)?;

    rec.name = buf[open + 1..close].to_string();

    let rest = &buf[close + 1..];
    if rest.trim().is_empty() {
        return Err(ParseError::NothingAfterName);
    }

    let mut tokens = rest.split_ascii_whitespace();
    for &(slot, presence) in LAYOUT {
        match tokens.next() {
            Some(tok) => slot.store(rec, tok)?,
            None if presence == Trailing => break,
            None => return Err(ParseError::Truncated { field: slot.name() }),
        }
    }

    if rec.is_kernel_thread() {
        rec.name = format!("[{}]", rec.name);
    }

    Ok(())
}

/// Parses a stat record into a fresh `StatRecord`.
pub fn parse_stat(buf: &str) -> Result<StatRecord, ParseError> {
    let mut rec = StatRecord::default();
    parse_stat_into(buf, &mut rec)?;
    Ok(rec)
}
