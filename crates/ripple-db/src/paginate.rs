use ripple_types::pagination::{PageRequest, Paginated};
use rusqlite::{Connection, Row, types::ToSql};

use crate::Result;

/// Count, then fetch one page.
///
/// `select_sql` must bind its parameters as `?1..?N` matching `params` and
/// must not carry its own LIMIT; the page window is appended here. The total
/// is always counted first so the `Last` sentinel can be resolved before the
/// page is read.
pub(crate) fn paginate<T, F>(
    conn: &Connection,
    count_sql: &str,
    select_sql: &str,
    params: &[&dyn ToSql],
    request: PageRequest,
    map: F,
) -> Result<Paginated<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let total: i64 = conn.query_row(count_sql, params, |r| r.get(0))?;
    let total = u64::try_from(total).unwrap_or(0);

    let page = request.resolve(total);
    let per_page = request.per_page;
    let limit = i64::from(per_page);
    let offset = i64::from(page - 1) * limit;

    let sql = format!(
        "{} LIMIT ?{} OFFSET ?{}",
        select_sql,
        params.len() + 1,
        params.len() + 2
    );
    let mut bound: Vec<&dyn ToSql> = params.to_vec();
    bound.push(&limit);
    bound.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(bound.as_slice(), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Paginated::new(items, page, per_page, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple_types::pagination::Page;

    fn numbers(n: i64) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE n (v INTEGER NOT NULL);").unwrap();
        for v in 1..=n {
            conn.execute("INSERT INTO n (v) VALUES (?1)", [v]).unwrap();
        }
        conn
    }

    fn page_of(conn: &Connection, page: Page, min: i64) -> Paginated<i64> {
        paginate(
            conn,
            "SELECT COUNT(*) FROM n WHERE v >= ?1",
            "SELECT v FROM n WHERE v >= ?1 ORDER BY v",
            &[&min],
            PageRequest::new(page, 4),
            |r| r.get(0),
        )
        .unwrap()
    }

    #[test]
    fn pages_are_windows_over_the_filtered_set() {
        let conn = numbers(10);
        let second = page_of(&conn, Page::Number(2), 3);
        assert_eq!(second.items, vec![7, 8, 9, 10]);
        assert_eq!(second.total, 8);
        assert_eq!(second.pages, 2);
        assert_eq!(second.next, None);
        assert_eq!(second.prev, Some(1));
    }

    #[test]
    fn last_sentinel_resolves_to_final_page() {
        let conn = numbers(10);
        let last = page_of(&conn, Page::Last, 1);
        assert_eq!(last.page, 3);
        assert_eq!(last.items, vec![9, 10]);
    }

    #[test]
    fn page_past_the_end_is_empty_not_an_error() {
        let conn = numbers(3);
        let page = page_of(&conn, Page::Number(9), 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn last_page_of_empty_set_is_page_one() {
        let conn = numbers(0);
        let page = page_of(&conn, Page::Last, 1);
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 0);
        assert!(page.items.is_empty());
    }
}
