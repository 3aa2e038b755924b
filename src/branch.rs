//! Types for representing branches and branch outcomes.

/// A branch outcome.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    /// Not taken
    N = 0,
    /// Taken
    T = 1
}

impl Outcome {
    pub fn from_bool(b: bool) -> Self {
        match b {
            true => Self::T,
            false => Self::N,
        }
    }

    pub fn is_taken(self) -> bool {
        matches!(self, Self::T)
    }
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            Self::T => "t",
            Self::N => "n",
        };
        write!(f, "{}", s)
    }
}

impl std::ops::Not for Outcome {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Self::N => Self::T,
            Self::T => Self::N,
        }
    }
}

impl From<bool> for Outcome {
    fn from(x: bool) -> Self {
        Self::from_bool(x)
    }
}
impl From<Outcome> for bool {
    fn from(x: Outcome) -> bool {
        x.is_taken()
    }
}

/// The category of an instruction seen by the trace harness.
///
/// Only conditional branches are predicted. Everything else is passed to
/// [`crate::Predictor::track_other_inst`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpType {
    /// Any non-branch instruction
    Op,
    JmpDirectUncond,
    JmpIndirectUncond,
    JmpDirectCond,
    JmpIndirectCond,
    CallDirectUncond,
    CallIndirectUncond,
    CallDirectCond,
    CallIndirectCond,
    RetUncond,
    RetCond,
}
impl OpType {
    /// Returns true for instructions whose direction must be predicted.
    pub fn is_conditional(&self) -> bool {
        matches!(self,
            Self::JmpDirectCond | Self::JmpIndirectCond |
            Self::CallDirectCond | Self::CallIndirectCond |
            Self::RetCond
        )
    }

    /// Short mnemonic used by the text trace format.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Op                 => "op",
            Self::JmpDirectUncond    => "jmp",
            Self::JmpIndirectUncond  => "ijmp",
            Self::JmpDirectCond      => "br",
            Self::JmpIndirectCond    => "ibr",
            Self::CallDirectUncond   => "call",
            Self::CallIndirectUncond => "icall",
            Self::CallDirectCond     => "ccall",
            Self::CallIndirectCond   => "iccall",
            Self::RetUncond          => "ret",
            Self::RetCond            => "cret",
        }
    }

    /// Parse a mnemonic produced by [`OpType::mnemonic`].
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let res = match s {
            "op"     => Self::Op,
            "jmp"    => Self::JmpDirectUncond,
            "ijmp"   => Self::JmpIndirectUncond,
            "br"     => Self::JmpDirectCond,
            "ibr"    => Self::JmpIndirectCond,
            "call"   => Self::CallDirectUncond,
            "icall"  => Self::CallIndirectUncond,
            "ccall"  => Self::CallDirectCond,
            "iccall" => Self::CallIndirectCond,
            "ret"    => Self::RetUncond,
            "cret"   => Self::RetCond,
            _ => return None,
        };
        Some(res)
    }
}

/// A record of instruction execution.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BranchRecord {
    /// The program counter value for this instruction
    pub pc: u32,

    /// The category of instruction
    pub kind: OpType,

    /// The outcome evaluated for this branch
    pub outcome: Outcome,

    /// The target address evaluated for this branch
    pub tgt: u32,
}
