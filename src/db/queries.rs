pub const SELECT_NON_TERMINAL_TRIP: &str = r#"
SELECT trip_id FROM trips
WHERE owner_id = $1 AND status IN ('active', 'emergency')
FOR UPDATE;
"#;

pub const INSERT_TRIP: &str = r#"
INSERT INTO trips (
    trip_id, owner_id,
    origin_address, origin_lat, origin_lng,
    dest_address, dest_lat, dest_lng,
    travel_mode, distance_meters, distance_text, duration_seconds, duration_text,
    start_time, estimated_end_time, status,
    safety_check_interval_seconds, monitor_deviation, emergency_message, route_polyline
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
    $11, $12, $13, $14, $15, 'active', $16, $17, $18, $19
)
RETURNING *;
"#;

pub const SELECT_TRIP: &str = r#"
SELECT * FROM trips WHERE trip_id = $1;
"#;

pub const SELECT_ACTIVE_TRIP_FOR_USER: &str = r#"
SELECT * FROM trips
WHERE owner_id = $1 AND status IN ('active', 'emergency')
ORDER BY start_time DESC
LIMIT 1;
"#;

pub const UPDATE_TRIP_LIVE_POSITION: &str = r#"
UPDATE trips
SET last_lat = $2,
    last_lng = $3,
    last_point_at = $4
WHERE trip_id = $1 AND status IN ('active', 'emergency');
"#;

pub const UPDATE_TRIP_EMERGENCY: &str = r#"
UPDATE trips
SET status = 'emergency'
WHERE trip_id = $1 AND status = 'active';
"#;

pub const UPDATE_TRIP_COMPLETED: &str = r#"
UPDATE trips
SET status = 'completed',
    end_time = $2,
    actual_duration_seconds = $3
WHERE trip_id = $1 AND status IN ('active', 'emergency');
"#;

pub const INSERT_LOCATION_SAMPLE: &str = r#"
INSERT INTO location_samples (user_id, trip_id, lat, lng, timestamp)
VALUES ($1, $2, $3, $4, $5);
"#;

pub const SELECT_LATEST_LOCATION: &str = r#"
SELECT * FROM location_samples
WHERE user_id = $1
ORDER BY timestamp DESC
LIMIT 1;
"#;

pub const SELECT_TRIP_LOCATIONS: &str = r#"
SELECT * FROM location_samples
WHERE trip_id = $1
ORDER BY timestamp ASC;
"#;

pub const INSERT_CONTACT: &str = r#"
INSERT INTO emergency_contacts (
    contact_id, user_id, name, phone, email, relation,
    priority, notify_sms, notify_call, notify_email
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
RETURNING *;
"#;

pub const SELECT_CONTACTS: &str = r#"
SELECT * FROM emergency_contacts
WHERE user_id = $1
ORDER BY priority, created_at;
"#;

pub const UPDATE_CONTACT: &str = r#"
UPDATE emergency_contacts
SET name = $3, phone = $4, email = $5, relation = $6,
    priority = $7, notify_sms = $8, notify_call = $9, notify_email = $10
WHERE contact_id = $1 AND user_id = $2
RETURNING *;
"#;

pub const DELETE_CONTACT: &str = r#"
DELETE FROM emergency_contacts WHERE contact_id = $1 AND user_id = $2;
"#;

pub const INSERT_SAFE_ZONE: &str = r#"
INSERT INTO safe_zones (zone_id, user_id, name, address, lat, lng, radius_meters, created_by)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING *;
"#;

pub const SELECT_SAFE_ZONES: &str = r#"
SELECT * FROM safe_zones WHERE user_id = $1 ORDER BY created_at;
"#;

pub const DELETE_SAFE_ZONE: &str = r#"
DELETE FROM safe_zones WHERE zone_id = $1 AND user_id = $2;
"#;

pub const INSERT_NOTIFICATION: &str = r#"
INSERT INTO notifications (notification_id, user_id, kind, title, message)
VALUES ($1, $2, $3, $4, $5);
"#;

pub const SELECT_NOTIFICATIONS: &str = r#"
SELECT * FROM notifications
WHERE user_id = $1
ORDER BY created_at DESC
LIMIT $2;
"#;

pub const MARK_NOTIFICATION_READ: &str = r#"
UPDATE notifications SET read = true
WHERE notification_id = $1 AND user_id = $2;
"#;

pub const UPSERT_PROFILE: &str = r#"
INSERT INTO user_profiles (user_id, display_name, phone, email, updated_at)
VALUES ($1, $2, $3, $4, NOW())
ON CONFLICT (user_id) DO UPDATE
SET display_name = $2, phone = $3, email = $4, updated_at = NOW()
RETURNING *;
"#;

pub const SELECT_PROFILE: &str = r#"
SELECT * FROM user_profiles WHERE user_id = $1;
"#;

pub const INSERT_DEFAULT_SETTINGS: &str = r#"
INSERT INTO safety_settings (
    user_id, emergency_message, safety_check_interval_seconds,
    deviation_threshold_meters, route_buffer_meters,
    stagnation_radius_meters, stagnation_threshold_seconds,
    alert_countdown_seconds, auto_alert_on_missed_check,
    confirmation_window_seconds, monitor_deviation
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (user_id) DO NOTHING;
"#;

pub const SELECT_SETTINGS: &str = r#"
SELECT * FROM safety_settings WHERE user_id = $1;
"#;

pub const UPDATE_SETTINGS: &str = r#"
UPDATE safety_settings
SET emergency_message = $2,
    safety_check_interval_seconds = $3,
    deviation_threshold_meters = $4,
    route_buffer_meters = $5,
    stagnation_radius_meters = $6,
    stagnation_threshold_seconds = $7,
    alert_countdown_seconds = $8,
    auto_alert_on_missed_check = $9,
    confirmation_window_seconds = $10,
    monitor_deviation = $11
WHERE user_id = $1
RETURNING *;
"#;

pub const INSERT_GUARDIAN_LINK: &str = r#"
INSERT INTO guardians (guardian_id, ward_id)
VALUES ($1, $2)
ON CONFLICT (guardian_id, ward_id) DO NOTHING;
"#;

pub const SELECT_GUARDIAN_LINK: &str = r#"
SELECT 1 AS linked FROM guardians WHERE guardian_id = $1 AND ward_id = $2;
"#;

pub const DELETE_GUARDIAN_LINK: &str = r#"
DELETE FROM guardians WHERE guardian_id = $1 AND ward_id = $2;
"#;
