use std::io::Write;

use quarry::Cursor;

use crate::DemoResult;
use crate::user::User;

fn write_user_line(out: &mut impl Write, id: u64, name: &str) -> std::io::Result<()> {
    writeln!(out, "{} \"{}\"", id, name)
}

/// Prints every remaining row of `cursor` as `<id> "<name>"`.
pub fn print_cursor(out: &mut impl Write, cursor: &mut Cursor) -> DemoResult<usize> {
    let mut printed = 0;
    while cursor.advance() {
        let id = cursor.get::<u64, _>("id")?;
        let name = cursor.get::<String, _>("name")?;
        write_user_line(out, id, &name)?;
        printed += 1;
    }
    Ok(printed)
}

pub fn print_users(out: &mut impl Write, users: &[User]) -> DemoResult<usize> {
    for user in users {
        write_user_line(out, user.id, &user.name)?;
    }
    Ok(users.len())
}
