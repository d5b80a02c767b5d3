diesel::table! {
    users (id) {
        id -> Integer,
        open_id -> Text,
        name -> Nullable<Text>,
        email -> Nullable<Text>,
        login_method -> Nullable<Text>,
        role -> Text,
        last_signed_in -> BigInt,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    books (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        description -> Nullable<Text>,
        target_chapters -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    chapters (id) {
        id -> Integer,
        book_id -> Integer,
        chapter_number -> Integer,
        title -> Text,
        status -> Text,
        progress -> Integer,
        notes -> Nullable<Text>,
        next_steps -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    sessions (id) {
        id -> Integer,
        user_id -> Integer,
        book_id -> Integer,
        chapter_id -> Nullable<Integer>,
        mode -> Text,
        start_time -> BigInt,
        end_time -> Nullable<BigInt>,
        duration -> Nullable<BigInt>,
        notes_count -> Integer,
        session_notes -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    atomic_notes (id) {
        id -> Integer,
        user_id -> Integer,
        book_id -> Integer,
        session_id -> Nullable<Integer>,
        chapter_id -> Nullable<Integer>,
        content -> Text,
        tags -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    rituals (id) {
        id -> Integer,
        user_id -> Integer,
        ritual_type -> Text,
        date -> BigInt,
        completed -> Integer,
        checklist_items -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    milestones (id) {
        id -> Integer,
        user_id -> Integer,
        book_id -> Integer,
        description -> Text,
        milestone_type -> Text,
        date -> BigInt,
        celebration_notes -> Nullable<Text>,
        created_at -> BigInt,
    }
}

diesel::table! {
    user_settings (id) {
        id -> Integer,
        user_id -> Integer,
        notifications_enabled -> Integer,
        maintenance_reminder_time -> Text,
        construction_reminder_time -> Text,
        email_notifications -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}
