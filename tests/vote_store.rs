mod common;

use common::{Post, User, create_post, create_user, setup, setup_with, vote_rows_for_pair};
use vote_ledger::{
    config::VoteConfig,
    error::VoteError,
    models::{Model, MorphKey, NewVote},
    services::vote_service::{self, VoteFilter},
};

fn new_vote(user: &User, post: &Post, upvote: bool) -> NewVote {
    NewVote {
        voter: user.morph_key(),
        voteable: post.morph_key(),
        upvote,
    }
}

#[tokio::test]
async fn duplicate_insert_is_rejected_by_the_store() {
    let ledger = setup().await;
    let user = create_user(&ledger, "alice").await;
    let post = create_post(&ledger, "hello").await;

    vote_service::insert_vote(&ledger.db, ledger.config(), &new_vote(&user, &post, true))
        .await
        .unwrap();

    let err = vote_service::insert_vote(&ledger.db, ledger.config(), &new_vote(&user, &post, false))
        .await
        .unwrap_err();

    assert!(err.is_unique_violation());
    assert!(matches!(err, VoteError::Database(_)));
    assert_eq!(vote_rows_for_pair(&ledger, &user, &post).await, 1);
}

#[tokio::test]
async fn upsert_flips_direction_without_duplicating() {
    let ledger = setup().await;
    let user = create_user(&ledger, "alice").await;
    let post = create_post(&ledger, "hello").await;

    let first = vote_service::upsert_vote(&ledger.db, ledger.config(), &new_vote(&user, &post, true))
        .await
        .unwrap();
    let second =
        vote_service::upsert_vote(&ledger.db, ledger.config(), &new_vote(&user, &post, false))
            .await
            .unwrap();

    assert!(first.upvote);
    assert!(!second.upvote);
    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(vote_rows_for_pair(&ledger, &user, &post).await, 1);
}

#[tokio::test]
async fn find_update_and_delete_address_one_pair() {
    let ledger = setup().await;
    let user = create_user(&ledger, "alice").await;
    let post = create_post(&ledger, "hello").await;
    let config = ledger.config();

    assert!(
        vote_service::find_vote(&ledger.db, config, &user.morph_key(), &post.morph_key())
            .await
            .unwrap()
            .is_none()
    );

    let vote = vote_service::insert_vote(&ledger.db, config, &new_vote(&user, &post, true))
        .await
        .unwrap();
    assert_eq!(vote.voter(), user.morph_key());
    assert_eq!(vote.voteable(), post.morph_key());

    let updated = vote_service::update_vote_direction(&ledger.db, config, vote.id, false)
        .await
        .unwrap()
        .unwrap();
    assert!(updated.is_downvote());

    let found = vote_service::find_vote(&ledger.db, config, &user.morph_key(), &post.morph_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, vote.id);
    assert!(!found.upvote);

    assert!(
        vote_service::delete_vote(&ledger.db, config, &user.morph_key(), &post.morph_key())
            .await
            .unwrap()
    );
    assert!(
        !vote_service::delete_vote(&ledger.db, config, &user.morph_key(), &post.morph_key())
            .await
            .unwrap()
    );
    assert_eq!(vote_rows_for_pair(&ledger, &user, &post).await, 0);
}

#[tokio::test]
async fn count_and_list_apply_filters() {
    let ledger = setup().await;
    let alice = create_user(&ledger, "alice").await;
    let bob = create_user(&ledger, "bob").await;
    let first = create_post(&ledger, "first").await;
    let second = create_post(&ledger, "second").await;
    let config = ledger.config();

    for (user, post, upvote) in [(&alice, &first, true), (&bob, &first, false), (&alice, &second, false)] {
        vote_service::insert_vote(&ledger.db, config, &new_vote(user, post, upvote))
            .await
            .unwrap();
    }

    let on_first = VoteFilter::for_voteable(first.morph_key());
    assert_eq!(vote_service::count_votes(&ledger.db, config, &on_first).await.unwrap(), 2);
    assert_eq!(
        vote_service::count_votes(&ledger.db, config, &on_first.clone().direction(Some(true)))
            .await
            .unwrap(),
        1
    );

    let by_alice = vote_service::list_votes(&ledger.db, config, &VoteFilter::for_voter(alice.morph_key()))
        .await
        .unwrap();
    assert_eq!(by_alice.len(), 2);
    assert!(by_alice.iter().all(|vote| vote.voter_id == alice.id));

    let posts_only = VoteFilter {
        voteable_type: Some(Post::MORPH_TYPE.to_string()),
        ..VoteFilter::default()
    };
    assert_eq!(vote_service::count_votes(&ledger.db, config, &posts_only).await.unwrap(), 3);

    let nobody = VoteFilter::for_voter(MorphKey::new("user", uuid::Uuid::new_v4()));
    assert_eq!(vote_service::count_votes(&ledger.db, config, &nobody).await.unwrap(), 0);
}

#[tokio::test]
async fn configured_table_and_foreign_key_are_used() {
    let mut config = VoteConfig::default();
    config.models.vote = "post_reactions".to_string();
    config.column_names.user_foreign_key = "member_id".to_string();

    let ledger = setup_with(config).await;
    let user = create_user(&ledger, "alice").await;
    let post = create_post(&ledger, "hello").await;

    let vote = vote_service::insert_vote(&ledger.db, ledger.config(), &new_vote(&user, &post, true))
        .await
        .unwrap();
    assert_eq!(vote.voter_id, user.id);

    let stored = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post_reactions WHERE member_id = ?")
        .bind(user.id)
        .fetch_one(&ledger.db)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}
