use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;

use podium::entity::{job, result};
use podium::evaluation::ranking;

use crate::common::{TestApp, routes};

const PASSWORD: &str = "securepass";

/// An admin owning one challenge, plus a participant.
async fn setup(app: &TestApp) -> (String, String, i32) {
    let admin = app.create_user_with_role("admin", PASSWORD, "admin").await;
    let participant = app.create_authenticated_user("alice", PASSWORD).await;
    let challenge_id = app.create_challenge(&admin, "lung-ct").await;
    (admin, participant, challenge_id)
}

mod submissions {
    use super::*;

    #[tokio::test]
    async fn new_submission_is_paired_with_the_newest_method() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        app.create_method(cid, &admin, "eval:1").await;
        let newest = app.create_method(cid, &admin, "eval:2").await;

        let res = app
            .post_with_token(
                &routes::submissions(cid),
                &json!({"file": "predictions.zip"}),
                &participant,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let job_id = res.body["job_id"].as_str().expect("job should be created");

        let jobs = app.get_with_token(&routes::jobs(cid), &participant).await;
        assert_eq!(jobs.status, 200);
        let data = jobs.body["items"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], job_id);
        assert_eq!(data[0]["method_id"], newest);
        assert_eq!(data[0]["status"], "queued");
        assert_eq!(data[0]["submission_id"], res.body["id"]);
    }

    #[tokio::test]
    async fn submission_without_any_method_gets_no_job() {
        let app = TestApp::spawn().await;
        let (_, participant, cid) = setup(&app).await;

        let res = app
            .post_with_token(
                &routes::submissions(cid),
                &json!({"file": "predictions.zip"}),
                &participant,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body.get("job_id").is_none());
        assert_eq!(job::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn legacy_submission_is_credited_to_the_named_user() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        app.create_method(cid, &admin, "eval:1").await;

        let res = app
            .post_with_token(
                &routes::legacy_submissions(cid),
                &json!({"creator_username": "alice", "file": "old.zip"}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert!(res.body["job_id"].is_string());

        let mine = app.get_with_token(&routes::submissions(cid), &participant).await;
        assert_eq!(mine.body["items"].as_array().unwrap().len(), 1);
        assert_eq!(mine.body["items"][0]["file"], "old.zip");
    }

    #[tokio::test]
    async fn legacy_submission_for_unknown_user_is_not_found() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;

        let res = app
            .post_with_token(
                &routes::legacy_submissions(cid),
                &json!({"creator_username": "nobody", "file": "old.zip"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn participants_only_see_their_own_submissions() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        let other = app.create_authenticated_user("bob", PASSWORD).await;

        for token in [&participant, &other] {
            let res = app
                .post_with_token(&routes::submissions(cid), &json!({"file": "p.zip"}), token)
                .await;
            assert_eq!(res.status, 201, "{}", res.text);
        }

        let mine = app.get_with_token(&routes::submissions(cid), &participant).await;
        assert_eq!(mine.body["items"].as_array().unwrap().len(), 1);

        let all = app.get_with_token(&routes::submissions(cid), &admin).await;
        assert_eq!(all.body["items"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn submitting_to_a_missing_challenge_is_not_found() {
        let app = TestApp::spawn().await;
        let (_, participant, _) = setup(&app).await;

        let res = app
            .post_with_token(&routes::submissions(999), &json!({"file": "p.zip"}), &participant)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod methods {
    use super::*;

    #[tokio::test]
    async fn participants_cannot_register_methods() {
        let app = TestApp::spawn().await;
        let (_, participant, cid) = setup(&app).await;

        let res = app
            .post_with_token(&routes::methods(cid), &json!({"image": "eval:1"}), &participant)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn manual_job_defaults_to_newest_method() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;

        let submission = app
            .post_with_token(&routes::submissions(cid), &json!({"file": "p.zip"}), &participant)
            .await;
        let older = app.create_method(cid, &admin, "eval:1").await;
        let newest = app.create_method(cid, &admin, "eval:2").await;

        let res = app
            .post_with_token(
                &routes::jobs(cid),
                &json!({"submission_id": submission.body["id"]}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["method_id"], newest);

        let pinned = app
            .post_with_token(
                &routes::jobs(cid),
                &json!({"submission_id": submission.body["id"], "method_id": older}),
                &admin,
            )
            .await;
        assert_eq!(pinned.status, 201, "{}", pinned.text);
        assert_eq!(pinned.body["method_id"], older);
    }
}

mod results {
    use super::*;

    #[tokio::test]
    async fn new_result_caches_url_requests_ranking_and_mails_once() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;

        let body = app
            .create_result(cid, &admin, json!({"metrics": {"score": 0.8}}))
            .await;

        let id = body["id"].as_str().unwrap();
        let expected_url = routes::result(cid, id);
        assert_eq!(body["absolute_url"], expected_url.as_str());

        let stored = result::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].absolute_url, expected_url);

        assert_eq!(app.queue.requests(), vec![cid]);

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "admin@example.org");
        assert!(sent[0].subject.contains("lung-ct"));
        assert!(sent[0].body.contains(&expected_url));
    }

    #[tokio::test]
    async fn result_from_a_job_also_notifies_the_submitter() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        app.create_method(cid, &admin, "eval:1").await;
        let submission = app
            .post_with_token(&routes::submissions(cid), &json!({"file": "p.zip"}), &participant)
            .await;
        let job_id = submission.body["job_id"].clone();

        app.create_result(cid, &admin, json!({"job_id": job_id, "metrics": {"score": 1}}))
            .await;

        let mut recipients: Vec<String> = app.mailer.sent().into_iter().map(|m| m.to).collect();
        recipients.sort();
        assert_eq!(recipients, vec!["admin@example.org", "alice@example.org"]);
    }

    #[tokio::test]
    async fn updating_a_result_requests_ranking_without_mail() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;
        let body = app
            .create_result(cid, &admin, json!({"metrics": {"score": 0.8}}))
            .await;
        let id = body["id"].as_str().unwrap();

        let res = app
            .patch_with_token(&routes::result(cid, id), &json!({"public": false}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["public"], false);
        assert_eq!(res.body["absolute_url"], routes::result(cid, id).as_str());
        assert_eq!(app.queue.requests(), vec![cid, cid]);
        assert_eq!(app.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn result_for_a_job_of_another_challenge_is_rejected() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        let other = app.create_challenge(&admin, "brain-mri").await;
        app.create_method(other, &admin, "eval:1").await;
        let submission = app
            .post_with_token(&routes::submissions(other), &json!({"file": "p.zip"}), &participant)
            .await;

        let res = app
            .post_with_token(
                &routes::results(cid),
                &json!({"job_id": submission.body["job_id"], "metrics": {"score": 1}}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 404);
        assert!(app.queue.requests().is_empty());
    }

    #[tokio::test]
    async fn metrics_must_be_an_object() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;

        let res = app
            .post_with_token(&routes::results(cid), &json!({"metrics": [1, 2]}), &admin)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn participants_do_not_see_private_results() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        app.create_result(cid, &admin, json!({"metrics": {"score": 1}}))
            .await;
        let hidden = app
            .create_result(cid, &admin, json!({"metrics": {"score": 2}, "public": false}))
            .await;

        let listed = app.get_with_token(&routes::results(cid), &participant).await;
        assert_eq!(listed.body["items"].as_array().unwrap().len(), 1);

        let direct = app
            .get_with_token(
                &routes::result(cid, hidden["id"].as_str().unwrap()),
                &participant,
            )
            .await;
        assert_eq!(direct.status, 404);
    }
}

mod ranking_config {
    use super::*;

    #[tokio::test]
    async fn saving_config_creates_then_updates_and_requests_ranking() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;

        let defaults = app.get_with_token(&routes::config(cid), &participant).await;
        assert_eq!(defaults.status, 200);
        assert_eq!(defaults.body["score_jsonpath"], "score");
        assert!(defaults.body["updated_at"].is_null());

        let body = json!({
            "score_title": "Dice",
            "score_jsonpath": "dice.mean",
            "score_default_sort": "ascending",
        });
        let created = app.put_with_token(&routes::config(cid), &body, &admin).await;
        assert_eq!(created.status, 201, "{}", created.text);

        let updated = app.put_with_token(&routes::config(cid), &body, &admin).await;
        assert_eq!(updated.status, 200, "{}", updated.text);
        assert_eq!(updated.body["score_jsonpath"], "dice.mean");

        assert_eq!(app.queue.requests(), vec![cid, cid]);
    }

    #[tokio::test]
    async fn score_path_with_padded_segments_is_rejected() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;

        let res = app
            .put_with_token(
                &routes::config(cid),
                &json!({
                    "score_title": "Dice",
                    "score_jsonpath": "dice. mean",
                    "score_default_sort": "descending",
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(app.queue.requests().is_empty());
    }

    #[tokio::test]
    async fn tied_scores_share_a_rank() {
        let app = TestApp::spawn().await;
        let (admin, participant, cid) = setup(&app).await;
        for score in [0.9, 0.5, 0.9] {
            app.create_result(cid, &admin, json!({"metrics": {"score": score}}))
                .await;
        }
        app.create_result(cid, &admin, json!({"metrics": {"score": 1.0}, "public": false}))
            .await;

        let changed = ranking::recalculate(&app.db, cid).await.unwrap();
        assert_eq!(changed, Some(3));

        let listed = app.get_with_token(&routes::results(cid), &participant).await;
        let ranks: Vec<(f64, i64)> = listed.body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| {
                (
                    r["metrics"]["score"].as_f64().unwrap(),
                    r["rank"].as_i64().unwrap(),
                )
            })
            .collect();
        assert_eq!(ranks, vec![(0.9, 1), (0.9, 1), (0.5, 3)]);

        let private = result::Entity::find()
            .all(&app.db)
            .await
            .unwrap()
            .into_iter()
            .find(|r| !r.public)
            .unwrap();
        assert_eq!(private.rank, 0);
    }

    #[tokio::test]
    async fn ascending_config_reverses_the_order() {
        let app = TestApp::spawn().await;
        let (admin, _, cid) = setup(&app).await;
        app.put_with_token(
            &routes::config(cid),
            &json!({
                "score_title": "Error",
                "score_jsonpath": "error",
                "score_default_sort": "ascending",
            }),
            &admin,
        )
        .await;
        for error in [3, 1, 2] {
            app.create_result(cid, &admin, json!({"metrics": {"error": error}}))
                .await;
        }

        ranking::recalculate(&app.db, cid).await.unwrap();

        let listed = app.get_with_token(&routes::results(cid), &admin).await;
        let errors: Vec<i64> = listed.body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["metrics"]["error"].as_i64().unwrap())
            .collect();
        assert_eq!(errors, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn unknown_challenge_is_skipped() {
        let app = TestApp::spawn().await;

        assert_eq!(ranking::recalculate(&app.db, 42).await.unwrap(), None);
    }
}
