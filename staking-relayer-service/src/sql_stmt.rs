use sea_orm::DbBackend;

pub const DB_BACKEND: DbBackend = DbBackend::Postgres;

/// Claims a batch of due jobs in one statement so a claimed job can never
/// be picked up twice, even with more than one worker process attached.
pub const CLAIM_TRANSACTION_JOBS: &str = r#"UPDATE public.transaction_job
    SET status = 'running'
    WHERE id IN (
        SELECT id FROM public.transaction_job
        WHERE status = 'queued' AND available_at <= $1
        ORDER BY id ASC
        LIMIT $2
        FOR UPDATE SKIP LOCKED
    )
    RETURNING id"#;

pub const CLAIM_REFRESH_JOB: &str = r#"UPDATE public.option_refresh_job
    SET status = 'running'
    WHERE id IN (
        SELECT id FROM public.option_refresh_job
        WHERE status = 'queued' AND available_at <= $1
        ORDER BY id ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
    )
    RETURNING id"#;
