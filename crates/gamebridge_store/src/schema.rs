//! Diesel schema for the gamebridge tables.
//!
//! Column order here must match the `Queryable` row structs in
//! [`crate::models`].

diesel::table! {
    /// Game players, created on first report from any source. Never deleted.
    players (xuid) {
        xuid -> Text,
        last_name -> Text,
        first_seen_at -> BigInt,
        last_seen_at -> BigInt,
        online -> Bool,
        online_updated_at -> BigInt,
        last_ip -> Nullable<Text>,
        last_hwid -> Nullable<Text>,
    }
}

diesel::table! {
    /// Ban ledger. Activeness is derived from `revoked_at`/`expires_at`,
    /// never stored.
    bans (ban_id) {
        ban_id -> BigInt,
        xuid -> Text,
        reason -> Text,
        created_at -> BigInt,
        expires_at -> Nullable<BigInt>,
        revoked_at -> Nullable<BigInt>,
        updated_at -> BigInt,
        actor_type -> Text,
        actor_username -> Nullable<Text>,
        actor_server_key -> Nullable<Text>,
    }
}

diesel::table! {
    /// Denormalized enforcement targets for a ban (XUID always, IP/HWID
    /// when supplied).
    ban_targets (id) {
        id -> BigInt,
        ban_id -> BigInt,
        target_type -> Text,
        target_value -> Text,
    }
}

diesel::table! {
    /// Append-only ban audit trail. Rows are never updated or deleted.
    ban_events (id) {
        id -> BigInt,
        ban_id -> BigInt,
        event_type -> Text,
        actor_type -> Text,
        actor_username -> Nullable<Text>,
        actor_server_key -> Nullable<Text>,
        details -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    /// Pull-delivered administrative commands. `acknowledged_at` is set
    /// exactly once; rows are never deleted.
    server_commands (id) {
        id -> BigInt,
        server_key -> Text,
        cmd_type -> Text,
        payload_json -> Nullable<Text>,
        created_at -> BigInt,
        acknowledged_at -> Nullable<BigInt>,
    }
}

diesel::table! {
    /// Latest telemetry snapshot, one mutable row per server key.
    server_metrics_latest (server_key) {
        server_key -> Text,
        updated_at -> BigInt,
        ram_used_mb -> Nullable<Integer>,
        ram_max_mb -> Nullable<Integer>,
        cpu_load -> Nullable<Double>,
        players_online -> Nullable<Integer>,
        players_max -> Nullable<Integer>,
        tps -> Nullable<Double>,
        rx_kbps -> Nullable<Double>,
        tx_kbps -> Nullable<Double>,
    }
}

diesel::table! {
    /// Append-only telemetry history for charting.
    server_metrics (id) {
        id -> BigInt,
        server_key -> Text,
        created_at -> BigInt,
        ram_used_mb -> Nullable<Integer>,
        ram_max_mb -> Nullable<Integer>,
        cpu_load -> Nullable<Double>,
        players_online -> Nullable<Integer>,
        players_max -> Nullable<Integer>,
        tps -> Nullable<Double>,
        rx_kbps -> Nullable<Double>,
        tx_kbps -> Nullable<Double>,
    }
}

diesel::table! {
    /// Accumulated per-player statistics (playtime, kills, deaths).
    player_stats (xuid) {
        xuid -> Text,
        playtime_seconds -> BigInt,
        kills -> BigInt,
        deaths -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    /// Best-effort admin audit log.
    audit_log (id) {
        id -> BigInt,
        actor_username -> Nullable<Text>,
        action_key -> Text,
        details -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::allow_tables_to_appear_in_same_query!(players, bans, ban_targets, ban_events, player_stats);
