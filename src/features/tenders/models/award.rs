use std::str::FromStr;
use uuid::Uuid;

/// Who is notified when a tender is awarded (`AWARD_NOTIFY`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AwardNotifyTarget {
    #[default]
    Client,
    Contractor,
    Both,
}

impl AwardNotifyTarget {
    pub fn notifies_client(&self) -> bool {
        matches!(self, AwardNotifyTarget::Client | AwardNotifyTarget::Both)
    }

    pub fn notifies_contractor(&self) -> bool {
        matches!(self, AwardNotifyTarget::Contractor | AwardNotifyTarget::Both)
    }
}

impl FromStr for AwardNotifyTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(AwardNotifyTarget::Client),
            "contractor" => Ok(AwardNotifyTarget::Contractor),
            "both" => Ok(AwardNotifyTarget::Both),
            other => Err(format!(
                "AWARD_NOTIFY must be one of client, contractor, both (got '{}')",
                other
            )),
        }
    }
}

/// One notification to send after an award
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardRecipient {
    pub user_id: Uuid,
    pub message: String,
}
