use std::fmt::Write as _;

use crate::foundation::error::{CanvasError, CanvasResult};

/// Parsed animation save string:
/// `on direction current step_count dwell_0 .. dwell_{n-1} [compute_set]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SavedAnimation {
    pub(crate) on: bool,
    pub(crate) forward: bool,
    pub(crate) current: i64,
    pub(crate) dwell_ms: Vec<i64>,
    pub(crate) compute_set: Option<bool>,
}

impl SavedAnimation {
    pub(crate) fn parse(s: &str) -> CanvasResult<Self> {
        let toks: Vec<&str> = s.split_whitespace().collect();
        if toks.len() < 4 {
            return Err(CanvasError::invalid_save_string(format!(
                "expected at least 4 tokens, got {}",
                toks.len()
            )));
        }
        let on = parse_bool(toks[0], "on")?;
        let forward = parse_bool(toks[1], "direction")?;
        let current = parse_int(toks[2], "current")?;
        let n = parse_int(toks[3], "step count")?;
        if n <= 0 {
            return Err(CanvasError::invalid_save_string(format!(
                "step count must be > 0, got {n}"
            )));
        }
        let n = n as usize;
        if toks.len() < 4 + n {
            return Err(CanvasError::invalid_save_string(format!(
                "expected {n} dwell times, got {}",
                toks.len() - 4
            )));
        }
        let dwell_ms = toks[4..4 + n]
            .iter()
            .map(|t| {
                let v = parse_int(t, "dwell")?;
                if v <= 0 {
                    return Err(CanvasError::invalid_save_string(format!(
                        "dwell must be > 0, got {v}"
                    )));
                }
                Ok(v)
            })
            .collect::<CanvasResult<Vec<_>>>()?;
        let compute_set = toks
            .get(4 + n)
            .map(|t| parse_bool(t, "compute flag"))
            .transpose()?;
        Ok(Self {
            on,
            forward,
            current,
            dwell_ms,
            compute_set,
        })
    }

    pub(crate) fn format(&self) -> String {
        let mut out = format!(
            "{} {} {} {}",
            self.on,
            self.forward,
            self.current,
            self.dwell_ms.len()
        );
        for d in &self.dwell_ms {
            let _ = write!(out, " {d}");
        }
        if let Some(c) = self.compute_set {
            let _ = write!(out, " {c}");
        }
        out
    }
}

fn parse_bool(tok: &str, what: &str) -> CanvasResult<bool> {
    tok.parse()
        .map_err(|_| CanvasError::invalid_save_string(format!("bad {what} flag '{tok}'")))
}

fn parse_int(tok: &str, what: &str) -> CanvasResult<i64> {
    tok.parse()
        .map_err(|_| CanvasError::invalid_save_string(format!("bad {what} '{tok}'")))
}

#[cfg(test)]
#[path = "../../tests/unit/animation/save_string.rs"]
mod tests;
