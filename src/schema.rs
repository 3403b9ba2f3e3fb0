table! {
    activities (id) {
        id -> Int8,
        type_id -> Int4,
        description -> Varchar,
        payload -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    additional_costs (id) {
        id -> Int8,
        match_id -> Int8,
        description -> Varchar,
        amount -> Float8,
        created_at -> Timestamptz,
    }
}

table! {
    matches (id) {
        id -> Int8,
        sport_center_id -> Int8,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        court -> Varchar,
        cost -> Float8,
        cost_per_section -> Float8,
        minute_per_section -> Int4,
        custom_section -> Nullable<Float8>,
        cost_overridden -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    players (id) {
        id -> Int8,
        first_name -> Varchar,
        last_name -> Varchar,
        email -> Varchar,
        external_user_id -> Nullable<Varchar>,
        rank -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    registrations (id) {
        id -> Int8,
        player_id -> Int8,
        match_id -> Int8,
        total_player_paid_for -> Int4,
        is_paid -> Bool,
        comment -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

table! {
    share_codes (id) {
        id -> Int8,
        code -> Varchar,
        full_url -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    sport_centers (id) {
        id -> Int8,
        name -> Varchar,
        location -> Varchar,
        cost_per_section -> Float8,
        minute_per_section -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    team_members (team_id, player_id) {
        team_id -> Int8,
        player_id -> Int8,
        role -> Varchar,
    }
}

table! {
    teams (id) {
        id -> Int8,
        name -> Varchar,
        description -> Varchar,
        owner_id -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int8,
        external_user_id -> Varchar,
        email -> Varchar,
        name -> Varchar,
        picture -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    wallet_transactions (id) {
        id -> Int8,
        wallet_id -> Int8,
        amount -> Float8,
        transaction_type -> Varchar,
        description -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    wallets (id) {
        id -> Int8,
        owner_id -> Int8,
        name -> Varchar,
        balance -> Float8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

joinable!(additional_costs -> matches (match_id));
joinable!(matches -> sport_centers (sport_center_id));
joinable!(registrations -> matches (match_id));
joinable!(registrations -> players (player_id));
joinable!(team_members -> players (player_id));
joinable!(team_members -> teams (team_id));
joinable!(wallet_transactions -> wallets (wallet_id));
joinable!(wallets -> players (owner_id));

allow_tables_to_appear_in_same_query!(
    activities,
    additional_costs,
    matches,
    players,
    registrations,
    share_codes,
    sport_centers,
    team_members,
    teams,
    users,
    wallet_transactions,
    wallets,
);
