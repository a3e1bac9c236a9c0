//! Cluster topology as seen during one poll cycle.

/// Member name and state label used for the standalone fallback.
pub const STANDALONE_LABEL: &str = "standalone";

/// One member of a replicated deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberStatus {
    pub name: String,
    /// 1 when the member reports itself healthy, else 0.
    pub health: u8,
    /// State label as reported (`PRIMARY`, `SECONDARY`, ...).
    pub state: String,
    pub is_primary: bool,
    /// Last applied operation time, seconds since the Unix epoch.
    pub optime_secs: Option<f64>,
}

/// The topology that is active for a cycle. Exactly one variant is
/// published per cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyView {
    Clustered {
        members: Vec<MemberStatus>,
        /// Optime of the primary-equivalent member, when it reports one.
        oplog_timestamp: Option<f64>,
    },
    /// No cluster status was available; a single healthy member is
    /// synthesized instead.
    Standalone,
}

impl TopologyView {
    /// The synthesized member reported by the standalone fallback.
    pub fn standalone_member() -> MemberStatus {
        MemberStatus {
            name: STANDALONE_LABEL.to_string(),
            health: 1,
            state: STANDALONE_LABEL.to_string(),
            is_primary: false,
            optime_secs: None,
        }
    }

    pub fn is_standalone(&self) -> bool {
        matches!(self, TopologyView::Standalone)
    }

    /// Members to export for this view.
    pub fn members(&self) -> Vec<MemberStatus> {
        match self {
            TopologyView::Clustered { members, .. } => members.clone(),
            TopologyView::Standalone => vec![Self::standalone_member()],
        }
    }

    pub fn oplog_timestamp(&self) -> Option<f64> {
        match self {
            TopologyView::Clustered {
                oplog_timestamp, ..
            } => *oplog_timestamp,
            TopologyView::Standalone => None,
        }
    }

    /// Seconds each member trails the primary, clamped at zero. Only
    /// members reporting an optime are included, and only when the
    /// oplog timestamp is known.
    pub fn replication_lag(&self) -> Vec<(String, f64)> {
        let (TopologyView::Clustered { members, .. }, Some(head)) = (self, self.oplog_timestamp())
        else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|m| {
                m.optime_secs
                    .map(|optime| (m.name.clone(), (head - optime).max(0.0)))
            })
            .collect()
    }
}
