use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fake::{
    faker::{
        address::en::{CountryName, ZipCode},
        boolean::en::Boolean,
        internet::en::{FreeEmail, IPv4, Username},
        lorem::en::Sentence,
    },
    Dummy, Fake, Faker,
};
use folio::pagination::{Filter, PageBrowser, Paginator, QueryPaginator};
use rusqlite::Connection;
use std::hint::black_box;

const ROWS: usize = 20_000;

#[derive(Debug, Dummy)]
pub struct Record {
    #[dummy(faker = "Username()")]
    pub username: String,
    #[dummy(faker = "FreeEmail()")]
    pub email: String,
    #[dummy(faker = "Boolean(50)")]
    pub is_active: bool,
    #[dummy(faker = "Sentence(1..30)")]
    pub bio: String,
    #[dummy(faker = "ZipCode()")]
    pub zip_code: String,
    #[dummy(faker = "CountryName()")]
    pub country: String,
    #[dummy(faker = "IPv4()")]
    pub ip_address: String,
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE records (
        id INTEGER PRIMARY KEY,
        username TEXT,
        email TEXT,
        is_active BOOLEAN,
        bio TEXT,
        zip_code TEXT,
        country TEXT,
        ip_address TEXT
    );
"#;

fn database() -> Connection {
    let mut conn = Connection::open_in_memory().expect("Could not open benchmark database");
    conn.execute_batch(CREATE_TABLE)
        .expect("Could not create the table for benchmark");

    let tx = conn.transaction().expect("Could not start transaction");
    {
        let mut insert = tx
            .prepare(
                "INSERT INTO records
                     (username, email, is_active, bio, zip_code, country, ip_address)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .expect("Could not prepare insert");

        for _ in 0..ROWS {
            let record: Record = Faker.fake();
            let Record {
                username,
                email,
                is_active,
                bio,
                zip_code,
                country,
                ip_address,
            } = record;

            insert
                .execute((username, email, is_active, bio, zip_code, country, ip_address))
                .expect("Could not insert into database");
        }
    }
    tx.commit().expect("Could not commit records");

    conn
}

fn page_benchmark(c: &mut Criterion) {
    let conn = database();
    let mut group = c.benchmark_group("Page");

    for page_size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("cold", page_size), &page_size, |b, size| {
            let mut paginator = QueryPaginator::new(&conn, "SELECT * FROM records");
            b.iter(|| {
                paginator.clear_cache();
                black_box(paginator.get_page(1, *size, None).expect("Could not load page"));
            });
        });

        group.bench_with_input(BenchmarkId::new("cached", page_size), &page_size, |b, size| {
            let mut paginator = QueryPaginator::new(&conn, "SELECT * FROM records");
            paginator.get_page(1, *size, None).expect("Could not load page");
            b.iter(|| black_box(paginator.get_page(1, *size, None).expect("Could not load page")));
        });
    }

    group.finish();
}

fn chunk_benchmark(c: &mut Criterion) {
    let conn = database();

    c.bench_function("chunks_full_scan", |b| {
        b.iter(|| {
            let mut paginator = QueryPaginator::new(&conn, "SELECT * FROM records ORDER BY id");
            let rows: usize = paginator
                .get_page_iterator(5_000, None)
                .map(|chunk| chunk.expect("Could not load chunk").data.len())
                .sum();

            assert_eq!(rows, ROWS);
        });
    });
}

fn filter_benchmark(c: &mut Criterion) {
    let conn = database();

    c.bench_function("filter_all_columns", |b| {
        b.iter(|| {
            let mut browser = PageBrowser::new(QueryPaginator::new(&conn, "SELECT * FROM records"));
            browser.load_initial_page().expect("Could not load first page");
            black_box(
                browser
                    .apply_filter(Filter::new("gmail"))
                    .expect("Could not apply filter"),
            );
        });
    });
}

criterion_group!(benches, page_benchmark, chunk_benchmark, filter_benchmark);
criterion_main!(benches);
