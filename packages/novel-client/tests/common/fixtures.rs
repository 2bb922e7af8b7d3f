//! Canned backend payloads.

use serde_json::{json, Value};

pub fn book(source: &str, source_id: u32, name: &str) -> Value {
    json!({
        "source_name": source,
        "source_id": source_id,
        "book_name": name,
        "author": "天蚕土豆",
        "url": format!("https://{}.example/book/{}", source_id, name),
        "category": "玄幻",
        "latest_chapter": "第一千六百二十三章 结束",
        "word_count": "532万字",
        "status": null
    })
}

/// Frame one payload as a stream record.
pub fn record(payload: &Value) -> String {
    format!("data: {}\n\n", payload)
}

pub fn records(payloads: &[Value]) -> Vec<u8> {
    payloads.iter().map(record).collect::<String>().into_bytes()
}

pub fn start(total: u32, keyword: &str) -> Value {
    json!({ "type": "start", "total": total, "keyword": keyword })
}

pub fn searching(source: &str) -> Value {
    json!({ "type": "searching", "source": source })
}

pub fn result(source: &str, completed: u32, total: u32, books: Vec<Value>) -> Value {
    let count = books.len();
    json!({
        "type": "result",
        "source": source,
        "books": books,
        "count": count,
        "completed": completed,
        "total": total
    })
}

pub fn source_error(source: &str, completed: u32, total: u32, error: &str) -> Value {
    json!({
        "type": "error_source",
        "source": source,
        "error": error,
        "completed": completed,
        "total": total
    })
}

pub fn complete(books: Vec<Value>) -> Value {
    let total_books = books.len();
    json!({ "type": "complete", "total_books": total_books, "books": books })
}

pub fn fatal(message: &str) -> Value {
    json!({ "type": "error", "message": message })
}

/// Two sources, one hit, then completion.
pub fn two_source_stream(keyword: &str) -> Vec<u8> {
    records(&[
        start(2, keyword),
        searching("笔趣阁"),
        result("笔趣阁", 1, 2, vec![book("笔趣阁", 1, "斗破苍穹")]),
        searching("顶点小说"),
        result("顶点小说", 2, 2, vec![]),
        complete(vec![book("笔趣阁", 1, "斗破苍穹")]),
    ])
}

pub fn task(id: &str, status: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "book_url": "https://1.example/book/斗破苍穹",
        "source_name": "笔趣阁",
        "status": status,
        "progress": 40,
        "total_chapters": 10,
        "downloaded_chapters": 4,
        "book_name": "斗破苍穹",
        "author": "天蚕土豆",
        "error": null,
        "created_at": created_at
    })
}
