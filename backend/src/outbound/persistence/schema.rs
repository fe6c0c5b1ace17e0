//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts. Emails are unique ignoring case (`users_email_lower_idx`).
    users (id) {
        id -> Int8,
        username -> Varchar,
        email -> Varchar,
        full_name -> Varchar,
        bio -> Text,
        lang -> Varchar,
        color -> Varchar,
        password_hash -> Nullable<Text>,
        is_active -> Bool,
        is_superuser -> Bool,
        date_joined -> Timestamptz,
        email_token -> Nullable<Varchar>,
        new_email -> Nullable<Varchar>,
        recovery_token -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Projects. `last_ref` is the per-project reference sequence shared by
    /// user stories, tasks and issues.
    projects (id) {
        id -> Int8,
        name -> Varchar,
        slug -> Varchar,
        description -> Text,
        owner_id -> Int8,
        created_date -> Timestamptz,
        modified_date -> Timestamptz,
        is_private -> Bool,
        anon_permissions -> Array<Text>,
        public_permissions -> Array<Text>,
        default_us_status_id -> Nullable<Int8>,
        default_issue_status_id -> Nullable<Int8>,
        total_story_points -> Nullable<Int4>,
        total_milestones -> Nullable<Int4>,
        creation_template -> Varchar,
        tags -> Array<Text>,
        last_ref -> Int8,
        default_task_status_id -> Nullable<Int8>,
    }
}

diesel::table! {
    roles (id) {
        id -> Int8,
        project_id -> Int8,
        name -> Varchar,
        slug -> Varchar,
        sort_order -> Int4,
        computable -> Bool,
        permissions -> Array<Text>,
    }
}

diesel::table! {
    /// Memberships and pending invitations (`user_id IS NULL`).
    memberships (id) {
        id -> Int8,
        project_id -> Int8,
        user_id -> Nullable<Int8>,
        role_id -> Int8,
        email -> Nullable<Varchar>,
        is_owner -> Bool,
        token -> Nullable<Varchar>,
        invited_by_id -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    statuses (id) {
        id -> Int8,
        project_id -> Int8,
        kind -> Varchar,
        name -> Varchar,
        slug -> Varchar,
        sort_order -> Int4,
        is_closed -> Bool,
        color -> Varchar,
    }
}

diesel::table! {
    user_stories (id) {
        id -> Int8,
        #[sql_name = "ref"]
        reference -> Int8,
        project_id -> Int8,
        owner_id -> Nullable<Int8>,
        status_id -> Nullable<Int8>,
        subject -> Text,
        description -> Text,
        tags -> Array<Text>,
        is_archived -> Bool,
        is_closed -> Bool,
        backlog_order -> Int8,
        sprint_order -> Int8,
        kanban_order -> Int8,
        version -> Int4,
        generated_from_issue_id -> Nullable<Int8>,
        created_date -> Timestamptz,
        modified_date -> Timestamptz,
        finish_date -> Nullable<Timestamptz>,
        milestone_id -> Nullable<Int8>,
    }
}

diesel::table! {
    milestones (id) {
        id -> Int8,
        project_id -> Int8,
        owner_id -> Nullable<Int8>,
        name -> Varchar,
        slug -> Varchar,
        estimated_start -> Date,
        estimated_finish -> Date,
        closed -> Bool,
        disponibility -> Float8,
        sort_order -> Int4,
        created_date -> Timestamptz,
        modified_date -> Timestamptz,
    }
}

diesel::table! {
    tasks (id) {
        id -> Int8,
        #[sql_name = "ref"]
        reference -> Int8,
        project_id -> Int8,
        owner_id -> Nullable<Int8>,
        status_id -> Nullable<Int8>,
        user_story_id -> Nullable<Int8>,
        milestone_id -> Nullable<Int8>,
        subject -> Text,
        description -> Text,
        tags -> Array<Text>,
        is_iocaine -> Bool,
        is_closed -> Bool,
        version -> Int4,
        created_date -> Timestamptz,
        modified_date -> Timestamptz,
        finished_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    issues (id) {
        id -> Int8,
        #[sql_name = "ref"]
        reference -> Int8,
        project_id -> Int8,
        owner_id -> Nullable<Int8>,
        status_id -> Nullable<Int8>,
        subject -> Text,
        description -> Text,
        tags -> Array<Text>,
        is_closed -> Bool,
        version -> Int4,
        created_date -> Timestamptz,
        modified_date -> Timestamptz,
        finished_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Project stars and issue votes, keyed by `(kind, object_id, user_id)`.
    votes (kind, object_id, user_id) {
        kind -> Varchar,
        object_id -> Int8,
        user_id -> Int8,
    }
}

diesel::table! {
    history_entries (id) {
        id -> Uuid,
        key -> Varchar,
        user_id -> Nullable<Int8>,
        user_name -> Varchar,
        created_at -> Timestamptz,
        kind -> Varchar,
        diff -> Jsonb,
        values_diff -> Jsonb,
        snapshot -> Nullable<Jsonb>,
        comment -> Text,
        delete_comment_date -> Nullable<Timestamptz>,
        delete_comment_user -> Nullable<Jsonb>,
        is_hidden -> Bool,
        is_snapshot -> Bool,
    }
}

diesel::table! {
    feedback_entries (id) {
        id -> Int8,
        full_name -> Varchar,
        email -> Varchar,
        comment -> Text,
        created_date -> Timestamptz,
    }
}

diesel::table! {
    /// Stored project templates; status and role blueprints are JSON arrays.
    project_templates (slug) {
        slug -> Varchar,
        name -> Varchar,
        description -> Text,
        created_date -> Nullable<Timestamptz>,
        default_owner_role -> Varchar,
        default_us_status -> Varchar,
        default_issue_status -> Varchar,
        us_statuses -> Jsonb,
        issue_statuses -> Jsonb,
        roles -> Jsonb,
        default_task_status -> Varchar,
        task_statuses -> Jsonb,
    }
}

diesel::joinable!(projects -> users (owner_id));
diesel::joinable!(roles -> projects (project_id));
diesel::joinable!(memberships -> projects (project_id));
diesel::joinable!(memberships -> roles (role_id));
diesel::joinable!(statuses -> projects (project_id));
diesel::joinable!(user_stories -> projects (project_id));
diesel::joinable!(issues -> projects (project_id));
diesel::joinable!(milestones -> projects (project_id));
diesel::joinable!(user_stories -> milestones (milestone_id));
diesel::joinable!(tasks -> projects (project_id));
diesel::joinable!(tasks -> user_stories (user_story_id));
diesel::joinable!(tasks -> milestones (milestone_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    projects,
    roles,
    memberships,
    statuses,
    milestones,
    user_stories,
    tasks,
    issues,
    votes,
    history_entries,
    feedback_entries,
    project_templates,
);
