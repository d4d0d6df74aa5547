use std::io::Cursor;

use sea_orm::EntityTrait;

use podium::entity::upload;

use crate::common::{TestApp, routes};

const PASSWORD: &str = "securepass";

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// `data-src` values of a rendered image picker.
fn picker_sources(page: &str) -> Vec<String> {
    page.split("data-src=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(str::to_string)
        .collect()
}

mod global_uploads {
    use super::*;

    #[tokio::test]
    async fn upload_calls_back_with_the_media_url_and_writes_a_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        let bytes = png_bytes(120, 90);

        let res = app
            .editor_upload(routes::EDITOR_UPLOAD, "figure.png", bytes.clone(), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.text.contains("window.parent.CKEDITOR.tools.callFunction(1, "));
        let url = res.callback_value();
        assert!(url.starts_with("/media/uploads/"), "{url}");
        assert!(url.ends_with("/figure.png"), "{url}");

        let stored = app.media_path(&url);
        assert_eq!(std::fs::read(&stored).unwrap(), bytes);

        let thumb = stored.with_file_name("figure_thumb.png");
        let dimensions = image::image_dimensions(&thumb).expect("thumbnail should exist");
        assert_eq!(dimensions, (75, 75));

        let (status, served) = app.get_bytes(&url).await;
        assert_eq!(status, 200);
        assert_eq!(served, bytes);
    }

    #[tokio::test]
    async fn repeated_names_get_underscores() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let mut urls = Vec::new();
        for _ in 0..3 {
            let res = app
                .editor_upload(routes::EDITOR_UPLOAD, "x.png", png_bytes(10, 10), &token)
                .await;
            assert_eq!(res.status, 200, "{}", res.text);
            urls.push(res.callback_value());
        }

        let names: Vec<&str> = urls
            .iter()
            .map(|u| u.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(names, vec!["x.png", "x_.png", "x__.png"]);
    }

    #[tokio::test]
    async fn upload_named_like_a_thumbnail_survives_later_thumbnails() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        let document = b"quarterly figures".to_vec();

        let first = app
            .editor_upload(routes::EDITOR_UPLOAD, "x_thumb.png", document.clone(), &token)
            .await;
        assert_eq!(first.status, 200, "{}", first.text);
        let first_url = first.callback_value();
        assert!(first_url.ends_with("/x_thumb_.png"), "{first_url}");

        let second = app
            .editor_upload(routes::EDITOR_UPLOAD, "x.png", png_bytes(40, 40), &token)
            .await;
        assert_eq!(second.status, 200, "{}", second.text);
        let stored = app.media_path(&second.callback_value());
        let thumb = stored.with_file_name("x_thumb.png");
        assert_eq!(image::image_dimensions(&thumb).unwrap(), (75, 75));

        assert_eq!(std::fs::read(app.media_path(&first_url)).unwrap(), document);
    }

    #[tokio::test]
    async fn files_that_are_not_images_are_kept_without_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .editor_upload(routes::EDITOR_UPLOAD, "notes.txt", b"hello".to_vec(), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let stored = app.media_path(&res.callback_value());
        assert!(stored.exists());
        assert!(!stored.with_file_name("notes_thumb.txt").exists());
    }

    #[tokio::test]
    async fn unusable_file_name_reports_failure_to_the_editor() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .editor_upload(routes::EDITOR_UPLOAD, ".htaccess", b"deny".to_vec(), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.callback_value(), "Uploading failed");
    }

    #[tokio::test]
    async fn missing_upload_field_reports_failure_to_the_editor() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .upload_with_token(
                &format!("{}?CKEditorFuncNum=3", routes::EDITOR_UPLOAD),
                "other",
                "x.png",
                png_bytes(4, 4),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert!(res.text.contains("callFunction(3, 'Uploading failed')"));
    }

    #[tokio::test]
    async fn func_num_is_required() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .upload_with_token(routes::EDITOR_UPLOAD, "upload", "x.png", png_bytes(4, 4), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn participants_cannot_upload() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("alice", PASSWORD).await;

        let res = app
            .editor_upload(routes::EDITOR_UPLOAD, "x.png", png_bytes(4, 4), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn per_user_folders_when_restricted() {
        let app = TestApp::spawn_with(|c| c.uploads.restrict_by_user = true).await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .editor_upload(routes::EDITOR_UPLOAD, "x.png", png_bytes(4, 4), &token)
            .await;

        let url = res.callback_value();
        assert!(url.starts_with("/media/uploads/editor/"), "{url}");
    }
}

mod browse {
    use super::*;

    #[tokio::test]
    async fn picker_lists_uploads_but_not_thumbnails() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        let image = app
            .editor_upload(routes::EDITOR_UPLOAD, "a.png", png_bytes(50, 50), &token)
            .await
            .callback_value();
        let text = app
            .editor_upload(routes::EDITOR_UPLOAD, "b.txt", b"text".to_vec(), &token)
            .await
            .callback_value();

        let res = app
            .get_with_token(&format!("{}?CKEditorFuncNum=2", routes::EDITOR_BROWSE), &token)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.text.contains("var funcNum = 2;"));
        let mut sources = picker_sources(&res.text);
        sources.sort();
        assert_eq!(sources, vec![image.clone(), text.clone()]);

        let thumb = image.replace("a.png", "a_thumb.png");
        assert!(res.text.contains(&format!("<img src=\"{thumb}\"")));
        assert!(res.text.contains(&format!("<img src=\"{text}\"")));
    }

    #[tokio::test]
    async fn empty_picker() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app.get_with_token(routes::EDITOR_BROWSE, &token).await;

        assert_eq!(res.status, 200);
        assert!(res.text.contains("No images uploaded yet."));
    }

    #[tokio::test]
    async fn popup_can_authenticate_through_the_query_string() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .get_without_token(&format!(
                "{}?CKEditorFuncNum=1&access_token={token}",
                routes::EDITOR_BROWSE
            ))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn restricted_picker_shows_own_files_except_to_admins() {
        let app = TestApp::spawn_with(|c| c.uploads.restrict_by_user = true).await;
        let first = app.create_user_with_role("editor1", PASSWORD, "challenge_admin").await;
        let second = app.create_user_with_role("editor2", PASSWORD, "challenge_admin").await;
        let admin = app.create_user_with_role("root", PASSWORD, "admin").await;

        let mine = app
            .editor_upload(routes::EDITOR_UPLOAD, "mine.png", png_bytes(8, 8), &first)
            .await
            .callback_value();
        let theirs = app
            .editor_upload(routes::EDITOR_UPLOAD, "theirs.png", png_bytes(8, 8), &second)
            .await
            .callback_value();

        let own = app.get_with_token(routes::EDITOR_BROWSE, &first).await;
        assert_eq!(picker_sources(&own.text), vec![mine.clone()]);

        let all = app.get_with_token(routes::EDITOR_BROWSE, &admin).await;
        let mut sources = picker_sources(&all.text);
        sources.sort();
        assert_eq!(sources, vec![mine, theirs]);
    }
}

mod projects {
    use super::*;

    #[tokio::test]
    async fn upload_to_unknown_project_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .editor_upload(&routes::project_upload("missing"), "x.png", png_bytes(4, 4), &token)
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn project_upload_is_served_from_the_public_folder() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        app.create_challenge(&token, "lung-ct").await;
        let bytes = png_bytes(20, 20);

        let res = app
            .editor_upload(&routes::project_upload("lung-ct"), "shot.png", bytes.clone(), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let url = res.callback_value();
        assert_eq!(url, "/site/lung-ct/serve/public_html/shot.png/");

        let on_disk = app
            .config
            .uploads
            .projects_root
            .join("lung-ct/public_html/shot.png");
        assert_eq!(std::fs::read(on_disk).unwrap(), bytes);

        let (status, served) = app.get_bytes(&url).await;
        assert_eq!(status, 200);
        assert_eq!(served, bytes);

        let records = upload::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "shot.png");
        assert_eq!(records[0].permission_lvl, upload::PERMISSION_ALL);
        assert_eq!(records[0].content_type.as_deref(), Some("image/png"));
        assert_eq!(records[0].size, bytes.len() as i64);
    }

    #[tokio::test]
    async fn project_picker_lists_files_by_project_url() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        app.create_challenge(&token, "lung-ct").await;
        for name in ["a.png", "a.png"] {
            app.editor_upload(&routes::project_upload("lung-ct"), name, png_bytes(4, 4), &token)
                .await;
        }

        let res = app
            .get_with_token(&routes::project_browse("lung-ct"), &token)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(
            picker_sources(&res.text),
            vec![
                "/site/lung-ct/serve/public_html/a.png/",
                "/site/lung-ct/serve/public_html/a_.png/",
            ]
        );
    }

    #[tokio::test]
    async fn file_server_refuses_paths_outside_the_public_folder() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;
        app.create_challenge(&token, "lung-ct").await;
        std::fs::create_dir_all(app.config.uploads.projects_root.join("lung-ct/private")).unwrap();
        std::fs::write(
            app.config.uploads.projects_root.join("lung-ct/private/secret.txt"),
            b"secret",
        )
        .unwrap();

        let (status, _) = app.get_bytes("/site/lung-ct/serve/private/secret.txt").await;
        assert_eq!(status, 404);

        let (status, _) = app
            .get_bytes("/site/lung-ct/serve/public_html/%2E%2E/private/secret.txt")
            .await;
        assert_eq!(status, 404);
    }
}

mod debug {
    use super::*;

    #[tokio::test]
    async fn test_upload_reports_where_the_file_went() {
        let app = TestApp::spawn().await;
        let token = app.create_user_with_role("editor", PASSWORD, "challenge_admin").await;

        let res = app
            .upload_with_token(routes::TEST_UPLOAD, "file", "diagram.png", png_bytes(30, 30), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["filename"], "diagram.png");
        assert_eq!(res.body["url"], "/media/uploads/test/diagram.png");
        assert_eq!(res.body["thumbnail"], "/media/uploads/test/diagram_thumb.png");
    }

    #[tokio::test]
    async fn debug_routes_are_absent_outside_debug_mode() {
        let app = TestApp::spawn_with(|c| c.server.debug = false).await;

        let res = app.get_without_token("/api/v1/debug/test-widget").await;

        assert_eq!(res.status, 404);
    }
}
