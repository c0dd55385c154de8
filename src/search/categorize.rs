//! File-type categorization for deep file search results.

use crate::models::FileCategory;

const CODE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "ts", "c", "cpp", "h", "hpp", "java", "go", "rb", "m", "sh", "bat", "sql",
    "r", "jl", "ipynb", "vba",
];

const FIGURE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "tif", "tiff", "webp", "heic", "emf", "eps",
];

const DATA_EXTENSIONS: &[&str] = &[
    "csv", "tsv", "xlsx", "xls", "json", "parquet", "h5", "hdf5", "dat", "mat", "npz", "db",
];

// Path/name keyword groups, checked in fixed priority after extensions.
const DATA_INDICATORS: &[&str] = &["data", "dataset", "raw", "測定", "実験データ", "計測"];
const FIGURE_INDICATORS: &[&str] = &["fig", "image", "plot", "graph", "photo", "図", "画像", "写真"];
const CODE_INDICATORS: &[&str] = &["src", "script", "code", "notebook", "プログラム", "ソース"];
const REFERENCE_INDICATORS: &[&str] = &[
    "paper", "reference", "report", "manual", "文献", "論文", "報告書", "資料",
];

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Assign a category from the file's extension, else from keyword groups
/// over the full lowercased path, else `Folder`.
pub fn categorize_file(path: &str) -> FileCategory {
    if let Some(ext) = extension(path) {
        let ext = ext.as_str();
        if CODE_EXTENSIONS.contains(&ext) {
            return FileCategory::Code;
        }
        if FIGURE_EXTENSIONS.contains(&ext) {
            return FileCategory::Figure;
        }
        if DATA_EXTENSIONS.contains(&ext) {
            return FileCategory::Data;
        }
    }

    let lower = path.to_lowercase();
    for (indicators, category) in [
        (DATA_INDICATORS, FileCategory::Data),
        (FIGURE_INDICATORS, FileCategory::Figure),
        (CODE_INDICATORS, FileCategory::Code),
        (REFERENCE_INDICATORS, FileCategory::Reference),
    ] {
        if indicators.iter().any(|kw| lower.contains(kw)) {
            return category;
        }
    }

    FileCategory::Folder
}
