use serde::{Deserialize, Serialize};

/// Query string CKEditor appends to upload and browse requests.
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EditorQuery {
    /// Callback slot of the editor instance that opened the dialog.
    #[serde(rename = "CKEditorFuncNum")]
    #[param(rename = "CKEditorFuncNum", example = 1)]
    pub func_num: Option<u32>,
}

/// One entry of the image picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct BrowseImage {
    /// Thumbnail URL, or the image itself when no thumbnail exists.
    #[schema(example = "/media/uploads/2024/03/07/x_thumb.png")]
    pub thumb: String,
    #[schema(example = "/media/uploads/2024/03/07/x.png")]
    pub src: String,
}

/// Response of the debug upload endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TestUploadResponse {
    #[schema(example = "diagram.png")]
    pub filename: String,
    #[schema(example = "/media/uploads/test/diagram.png")]
    pub url: String,
    #[schema(example = 2048)]
    pub size: u64,
    /// Set when a thumbnail could be generated.
    #[schema(example = "/media/uploads/test/diagram_thumb.png")]
    pub thumbnail: Option<String>,
}
