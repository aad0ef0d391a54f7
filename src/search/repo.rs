use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::recipes::{repo::CARD_SELECT, repo_types::RecipeCard};

/// Case-insensitive substring match on title/description, optionally restricted
/// to recipes carrying any of `tag_ids`; most recently updated first.
pub async fn search_recipes(
    db: &PgPool,
    query: Option<&str>,
    tag_ids: &[Uuid],
) -> anyhow::Result<Vec<RecipeCard>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(&q.to_lowercase())));
    let tags: Option<&[Uuid]> = (!tag_ids.is_empty()).then_some(tag_ids);

    let rows = sqlx::query_as::<_, RecipeCard>(&format!(
        r#"
        {CARD_SELECT}
        WHERE ($1::text IS NULL
               OR lower(r.title) LIKE $1 ESCAPE '\'
               OR lower(COALESCE(r.description, '')) LIKE $1 ESCAPE '\')
          AND ($2::uuid[] IS NULL
               OR EXISTS (SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
        ORDER BY r.updated_at DESC NULLS LAST, r.created_at DESC
        "#
    ))
    .bind(pattern)
    .bind(tags)
    .fetch_all(db)
    .await
    .context("search recipes")?;
    Ok(rows)
}

pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("soup"), "soup");
    }
}
