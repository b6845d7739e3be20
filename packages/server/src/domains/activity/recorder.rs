use crate::kernel::BaseActivityLog;

use super::{NewSuspiciousActivity, NewUserActivity};

/// Record a user action; failures are logged and dropped.
pub async fn record_activity(log: &dyn BaseActivityLog, activity: NewUserActivity) {
    let activity_type = activity.activity_type;
    let user_id = activity.user_id;
    if let Err(e) = log.record_activity(activity).await {
        tracing::warn!(
            error = %e,
            %user_id,
            %activity_type,
            "Failed to record user activity"
        );
    }
}

/// Record a suspicious event; failures are logged and dropped.
pub async fn record_suspicious(log: &dyn BaseActivityLog, activity: NewSuspiciousActivity) {
    let activity_type = activity.activity_type.clone();
    if let Err(e) = log.record_suspicious(activity).await {
        tracing::warn!(
            error = %e,
            activity_type = %activity_type,
            "Failed to record suspicious activity"
        );
    }
}
