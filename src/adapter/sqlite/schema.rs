//! Diesel table definitions. Kept in sync with migrations/.

diesel::table! {
    domain_events (event_id) {
        event_id -> BigInt,
        name -> Text,
        token_id -> Nullable<Text>,
        unique_id -> Nullable<Text>,
        relay_id -> Nullable<Text>,
        event_type -> Text,
        event_data -> Text,
        created_at -> Text,
        processed -> Bool,
    }
}

diesel::table! {
    ingest_cursor (id) {
        id -> Integer,
        last_event_id -> BigInt,
    }
}

diesel::table! {
    subscriptions (id) {
        id -> Text,
        user_id -> Text,
        event_type -> Text,
        webhook_url -> Text,
        filters -> Text,
        is_active -> Bool,
    }
}

diesel::table! {
    webhook_deliveries (id) {
        id -> Nullable<Integer>,
        subscription_id -> Text,
        event_id -> BigInt,
        status -> Text,
        response_status -> Nullable<Integer>,
        error_message -> Nullable<Text>,
        delivered_at -> Text,
    }
}

diesel::table! {
    domain_analytics (name) {
        name -> Text,
        total_events -> BigInt,
        last_event_type -> Nullable<Text>,
        last_event_at -> Nullable<Text>,
        total_volume -> Text,
        highest_price -> Nullable<Text>,
        lowest_price -> Nullable<Text>,
        offer_count -> BigInt,
        trade_count -> BigInt,
        is_fractionalized -> Bool,
        expires_at -> Nullable<Text>,
    }
}

diesel::table! {
    domain_traits (name) {
        name -> Text,
        label -> Text,
        extension -> Text,
        length -> Integer,
        is_numeric -> Bool,
        has_hyphen -> Bool,
        vowel_ratio -> Double,
        brandability -> Integer,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    domain_events,
    ingest_cursor,
    subscriptions,
    webhook_deliveries,
    domain_analytics,
    domain_traits,
);
