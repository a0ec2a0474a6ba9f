//! PostgreSQL implementation of the core store traits.
//!
//! Diesel is synchronous, so every call checks out a pooled connection on the
//! blocking thread pool.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use larder_core::store::{NewRecipe, RecipeStore};
use larder_core::types::{DraftIngredients, PersistedRecipe, TagRef};
use larder_core::StoreError;
use uuid::Uuid;

use crate::auth::{find_user_by_token_hash, AuthenticatedUser, SessionStore};
use crate::catalog::{RecipeCatalog, RecipeSummary, TagSummary};
use crate::db::DbPool;
use crate::models::{
    NewIngredient, NewIngredientGroup, NewRecipeRow, NewRecipeStep, NewRecipeTag, NewTag, Tag,
};
use crate::schema::{ingredient_groups, ingredients, recipe_steps, recipe_tags, recipes, tags};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, DieselError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            f(&mut conn).map_err(store_error)
        })
        .await
        .map_err(|e| StoreError::Database(format!("blocking task failed: {}", e)))?
    }
}

fn store_error(e: DieselError) -> StoreError {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::UniqueViolation {
                constraint: info.constraint_name().unwrap_or_default().to_string(),
            }
        }
        other => StoreError::Database(other.to_string()),
    }
}

/// Positions and counts come from generated drafts; clamp rather than fail.
fn to_i32(n: Option<u32>) -> Option<i32> {
    n.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

/// `slug` if free, otherwise the first free `slug-N` for N >= 2.
fn first_free_slug(slug: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == slug) {
        return slug.to_string();
    }
    (2..)
        .map(|n| format!("{}-{}", slug, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| slug.to_string())
}

fn insert_recipe_tree(conn: &mut PgConnection, recipe: &NewRecipe) -> QueryResult<Uuid> {
    let draft = &recipe.draft;

    let recipe_id: Uuid = diesel::insert_into(recipes::table)
        .values(NewRecipeRow {
            user_id: recipe.owner,
            slug: &recipe.slug,
            name: &draft.name,
            category: draft.category.as_deref(),
            description: draft.description.as_deref(),
            servings: to_i32(draft.servings),
            prep_minutes: to_i32(draft.prep_minutes),
            cook_minutes: to_i32(draft.cook_minutes),
            total_minutes: to_i32(draft.total_minutes),
            image_url: draft.image_url.as_deref(),
            video_url: draft.video_url.as_deref(),
            source_url: draft.source_url.as_deref(),
        })
        .returning(recipes::id)
        .get_result(conn)?;

    match &draft.ingredients {
        DraftIngredients::Flat(items) => {
            let rows: Vec<NewIngredient> = items
                .iter()
                .enumerate()
                .map(|(i, item)| NewIngredient {
                    recipe_id,
                    group_id: None,
                    position: position(i),
                    name: &item.name,
                    quantity: item.quantity.as_deref(),
                    unit: item.unit.as_deref(),
                    note: item.note.as_deref(),
                })
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(ingredients::table)
                    .values(&rows)
                    .execute(conn)?;
            }
        }
        DraftIngredients::Grouped(groups) => {
            for (gi, group) in groups.iter().enumerate() {
                let group_id: Uuid = diesel::insert_into(ingredient_groups::table)
                    .values(NewIngredientGroup {
                        recipe_id,
                        position: position(gi),
                        name: &group.name,
                    })
                    .returning(ingredient_groups::id)
                    .get_result(conn)?;

                let rows: Vec<NewIngredient> = group
                    .ingredients
                    .iter()
                    .enumerate()
                    .map(|(i, item)| NewIngredient {
                        recipe_id,
                        group_id: Some(group_id),
                        position: position(i),
                        name: &item.name,
                        quantity: item.quantity.as_deref(),
                        unit: item.unit.as_deref(),
                        note: item.note.as_deref(),
                    })
                    .collect();
                if !rows.is_empty() {
                    diesel::insert_into(ingredients::table)
                        .values(&rows)
                        .execute(conn)?;
                }
            }
        }
    }

    let steps: Vec<NewRecipeStep> = draft
        .steps
        .iter()
        .enumerate()
        .map(|(i, instruction)| NewRecipeStep {
            recipe_id,
            position: position(i),
            instruction: instruction.as_str(),
        })
        .collect();
    if !steps.is_empty() {
        diesel::insert_into(recipe_steps::table)
            .values(&steps)
            .execute(conn)?;
    }

    let links: Vec<NewRecipeTag> = recipe
        .tag_ids
        .iter()
        .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
        .collect();
    if !links.is_empty() {
        diesel::insert_into(recipe_tags::table)
            .values(&links)
            .on_conflict_do_nothing()
            .execute(conn)?;
    }

    Ok(recipe_id)
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn make_unique_slug(&self, slug: &str) -> Result<String, StoreError> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            // Slugs only contain [a-z0-9-], so no LIKE escaping is needed.
            let taken: Vec<String> = recipes::table
                .filter(
                    recipes::slug
                        .eq(&slug)
                        .or(recipes::slug.like(format!("{}-%", slug))),
                )
                .select(recipes::slug)
                .load(conn)?;
            Ok(first_free_slug(&slug, &taken))
        })
        .await
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<PersistedRecipe, StoreError> {
        let recipe = recipe.clone();
        self.with_conn(move |conn| {
            let id = conn.transaction(|conn| insert_recipe_tree(conn, &recipe))?;
            Ok(PersistedRecipe {
                id,
                slug: recipe.slug,
            })
        })
        .await
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRef>, StoreError> {
        let slug = slug.to_string();
        self.with_conn(move |conn| {
            let tag = tags::table
                .filter(tags::slug.eq(&slug))
                .select(Tag::as_select())
                .first(conn)
                .optional()?;
            Ok(tag.map(|t| TagRef {
                id: t.id,
                name: t.name,
                slug: t.slug,
            }))
        })
        .await
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<TagRef, StoreError> {
        let (name, slug) = (name.to_string(), slug.to_string());
        self.with_conn(move |conn| {
            let tag = diesel::insert_into(tags::table)
                .values(NewTag {
                    name: &name,
                    slug: &slug,
                })
                .returning(Tag::as_returning())
                .get_result(conn)?;
            Ok(TagRef {
                id: tag.id,
                name: tag.name,
                slug: tag.slug,
            })
        })
        .await
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn user_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthenticatedUser>, StoreError> {
        let token_hash = token_hash.to_string();
        self.with_conn(move |conn| {
            let user = find_user_by_token_hash(conn, &token_hash)?;
            Ok(user.map(|u| AuthenticatedUser {
                id: u.id,
                username: u.username,
            }))
        })
        .await
    }
}

#[async_trait]
impl RecipeCatalog for PgStore {
    async fn list_recipes(&self, owner: Uuid) -> Result<Vec<RecipeSummary>, StoreError> {
        self.with_conn(move |conn| {
            let rows = recipes::table
                .filter(recipes::user_id.eq(owner))
                .order(recipes::created_at.desc())
                .select((
                    recipes::id,
                    recipes::slug,
                    recipes::name,
                    recipes::category,
                    recipes::created_at,
                ))
                .load::<(Uuid, String, String, Option<String>, chrono::DateTime<chrono::Utc>)>(
                    conn,
                )?;
            Ok(rows
                .into_iter()
                .map(|(id, slug, name, category, created_at)| RecipeSummary {
                    id,
                    slug,
                    name,
                    category,
                    created_at,
                })
                .collect())
        })
        .await
    }

    async fn list_tags(&self, owner: Uuid) -> Result<Vec<TagSummary>, StoreError> {
        self.with_conn(move |conn| {
            let rows = tags::table
                .inner_join(recipe_tags::table.inner_join(recipes::table))
                .filter(recipes::user_id.eq(owner))
                .select(Tag::as_select())
                .distinct()
                .order(tags::name.asc())
                .load(conn)?;
            Ok(rows
                .into_iter()
                .map(|t| TagSummary {
                    id: t.id,
                    name: t.name,
                    slug: t.slug,
                })
                .collect())
        })
        .await
    }
}
