use super::ErrorKind::{self, *};
use super::Matcher::{self, *};

/// One row of a backend table: if `matcher` fits the failure, it is `kind`.
pub(crate) type Rule = (Matcher, ErrorKind);

pub(crate) static MYSQL: &[Rule] = &[
    (Code(1213), Deadlock),
    (Code(1205), LockWaitTimeout),
    (Code(1050), TableAlreadyExists),
    (Code(1051), TableNotFound),
    (Code(1146), TableNotFound),
    (Code(1216), ForeignKeyConstraintViolation),
    (Code(1217), ForeignKeyConstraintViolation),
    (Code(1451), ForeignKeyConstraintViolation),
    (Code(1452), ForeignKeyConstraintViolation),
    (Code(1701), ForeignKeyConstraintViolation),
    (Code(1062), UniqueConstraintViolation),
    (Code(1557), UniqueConstraintViolation),
    (Code(1569), UniqueConstraintViolation),
    (Code(1586), UniqueConstraintViolation),
    (Code(1054), InvalidFieldName),
    (Code(1166), InvalidFieldName),
    (Code(1611), InvalidFieldName),
    (Code(1052), AmbiguousFieldName),
    (Code(1060), AmbiguousFieldName),
    (Code(1110), AmbiguousFieldName),
    (Code(1064), SyntaxError),
    (Code(1149), SyntaxError),
    (Code(1287), SyntaxError),
    (Code(1341), SyntaxError),
    (Code(1342), SyntaxError),
    (Code(1343), SyntaxError),
    (Code(1344), SyntaxError),
    (Code(1382), SyntaxError),
    (Code(1479), SyntaxError),
    (Code(1541), SyntaxError),
    (Code(1554), SyntaxError),
    (Code(1626), SyntaxError),
    (Code(1044), ConnectionFailure),
    (Code(1045), ConnectionFailure),
    (Code(1046), ConnectionFailure),
    (Code(1049), ConnectionFailure),
    (Code(1095), ConnectionFailure),
    (Code(1142), ConnectionFailure),
    (Code(1143), ConnectionFailure),
    (Code(1227), ConnectionFailure),
    (Code(1370), ConnectionFailure),
    (Code(1429), ConnectionFailure),
    (Code(2002), ConnectionFailure),
    (Code(2005), ConnectionFailure),
    (Code(2006), ConnectionFailure),
    (Code(2013), ConnectionFailure),
    (Code(2054), ConnectionFailure),
    (Code(1048), NotNullConstraintViolation),
    (Code(1121), NotNullConstraintViolation),
    (Code(1138), NotNullConstraintViolation),
    (Code(1171), NotNullConstraintViolation),
    (Code(1252), NotNullConstraintViolation),
    (Code(1263), NotNullConstraintViolation),
    (Code(1364), NotNullConstraintViolation),
    (Code(1566), NotNullConstraintViolation),
    (Code(1290), ReadOnly),
    (Code(1792), ReadOnly),
    (Code(1836), ReadOnly),
    (SqlState("40001"), Deadlock),
    (SqlStateClass("08"), ConnectionFailure),
    (MessagePattern(r"(?i)server has gone away|lost connection to (mysql|mariadb) server"), ConnectionFailure),
    (MessagePattern(r"\[200[25]\]"), ConnectionFailure),
    (Message("deadlock found"), Deadlock),
];

pub(crate) static POSTGRES: &[Rule] = &[
    (SqlState("40001"), Deadlock),
    (SqlState("40P01"), Deadlock),
    (SqlState("23502"), NotNullConstraintViolation),
    (SqlState("23503"), ForeignKeyConstraintViolation),
    (SqlState("23505"), UniqueConstraintViolation),
    (SqlState("42601"), SyntaxError),
    (SqlState("42702"), AmbiguousFieldName),
    (SqlState("42703"), InvalidFieldName),
    (SqlState("42P01"), TableNotFound),
    (SqlState("42P07"), TableAlreadyExists),
    (SqlState("55P03"), LockWaitTimeout),
    (SqlState("25006"), ReadOnly),
    (SqlState("57P01"), ConnectionFailure),
    (SqlState("28P01"), ConnectionFailure),
    (SqlStateClass("08"), ConnectionFailure),
    (
        MessagePattern(r"(?i)pg_hba\.conf|password authentication failed|could not connect to server|server closed the connection"),
        ConnectionFailure,
    ),
    (Message("cannot truncate a table referenced in a foreign key"), ForeignKeyConstraintViolation),
];

pub(crate) static ORACLE: &[Rule] = &[
    (Code(1), UniqueConstraintViolation),
    (Code(2299), UniqueConstraintViolation),
    (Code(904), InvalidFieldName),
    (Code(918), AmbiguousFieldName),
    (Code(960), AmbiguousFieldName),
    (Code(923), SyntaxError),
    (Code(900), SyntaxError),
    (Code(942), TableNotFound),
    (Code(955), TableAlreadyExists),
    (Code(1017), ConnectionFailure),
    (Code(3113), ConnectionFailure),
    (Code(3114), ConnectionFailure),
    (Code(12514), ConnectionFailure),
    (Code(12541), ConnectionFailure),
    (Code(12545), ConnectionFailure),
    (Code(1400), NotNullConstraintViolation),
    (Code(2266), ForeignKeyConstraintViolation),
    (Code(2291), ForeignKeyConstraintViolation),
    (Code(2292), ForeignKeyConstraintViolation),
    (Code(60), Deadlock),
    (Code(54), LockWaitTimeout),
    (Code(30006), LockWaitTimeout),
    (Code(16000), ReadOnly),
    (MessagePattern(r"ORA-0311[34]|ORA-125\d\d"), ConnectionFailure),
];

pub(crate) static MSSQL: &[Rule] = &[
    (Code(2601), UniqueConstraintViolation),
    (Code(2627), UniqueConstraintViolation),
    (Code(547), ForeignKeyConstraintViolation),
    (Code(515), NotNullConstraintViolation),
    (Code(207), InvalidFieldName),
    (Code(209), AmbiguousFieldName),
    (Code(208), TableNotFound),
    (Code(2714), TableAlreadyExists),
    (Code(102), SyntaxError),
    (Code(156), SyntaxError),
    (Code(170), SyntaxError),
    (Code(1205), Deadlock),
    (Code(1222), LockWaitTimeout),
    (Code(53), ConnectionFailure),
    (Code(233), ConnectionFailure),
    (Code(4060), ConnectionFailure),
    (Code(10054), ConnectionFailure),
    (Code(10060), ConnectionFailure),
    (Code(18456), ConnectionFailure),
    (Code(3906), ReadOnly),
    (SqlStateClass("08"), ConnectionFailure),
    (Message("login failed"), ConnectionFailure),
];

pub(crate) static SQLITE: &[Rule] = &[
    (Code(2067), UniqueConstraintViolation),
    (Code(1555), UniqueConstraintViolation),
    (Code(787), ForeignKeyConstraintViolation),
    (Code(1299), NotNullConstraintViolation),
    (Code(5), LockWaitTimeout),
    (Code(261), LockWaitTimeout),
    (Code(517), LockWaitTimeout),
    (Code(6), LockWaitTimeout),
    (Code(8), ReadOnly),
    (Code(264), ReadOnly),
    (Code(520), ReadOnly),
    (Code(776), ReadOnly),
    (Code(1032), ReadOnly),
    (Code(14), ConnectionFailure),
    (Code(26), ConnectionFailure),
    (Message("database is locked"), LockWaitTimeout),
    (Message("unique constraint failed"), UniqueConstraintViolation),
    (Message("must be unique"), UniqueConstraintViolation),
    (Message("is not unique"), UniqueConstraintViolation),
    (Message("are not unique"), UniqueConstraintViolation),
    (Message("not null constraint failed"), NotNullConstraintViolation),
    (Message("may not be null"), NotNullConstraintViolation),
    (Message("foreign key constraint failed"), ForeignKeyConstraintViolation),
    (Message("no such table:"), TableNotFound),
    (Message("already exists"), TableAlreadyExists),
    (Message("has no column named"), InvalidFieldName),
    (Message("no such column:"), InvalidFieldName),
    (Message("ambiguous column name"), AmbiguousFieldName),
    (Message("syntax error"), SyntaxError),
    (Message("attempt to write a readonly database"), ReadOnly),
    (Message("unable to open database file"), ConnectionFailure),
];

pub(crate) static SYBASE: &[Rule] = &[
    (Code(2601), UniqueConstraintViolation),
    (Code(2627), UniqueConstraintViolation),
    (Code(546), ForeignKeyConstraintViolation),
    (Code(547), ForeignKeyConstraintViolation),
    (Code(233), NotNullConstraintViolation),
    (Code(515), NotNullConstraintViolation),
    (Code(207), InvalidFieldName),
    (Code(209), AmbiguousFieldName),
    (Code(208), TableNotFound),
    (Code(2714), TableAlreadyExists),
    (Code(102), SyntaxError),
    (Code(156), SyntaxError),
    (Code(1205), Deadlock),
    (Code(12205), LockWaitTimeout),
    (Code(4002), ConnectionFailure),
    (Code(3906), ReadOnly),
    (MessagePattern(r"(?i)login failed|connection refused|read from the server has failed"), ConnectionFailure),
];

pub(crate) static INFORMIX: &[Rule] = &[
    (Code(-239), UniqueConstraintViolation),
    (Code(-268), UniqueConstraintViolation),
    (Code(-100), UniqueConstraintViolation),
    (Code(-691), ForeignKeyConstraintViolation),
    (Code(-692), ForeignKeyConstraintViolation),
    (Code(-391), NotNullConstraintViolation),
    (Code(-217), InvalidFieldName),
    (Code(-324), AmbiguousFieldName),
    (Code(-206), TableNotFound),
    (Code(-310), TableAlreadyExists),
    (Code(-201), SyntaxError),
    (Code(-143), Deadlock),
    (Code(-144), LockWaitTimeout),
    (Code(-154), LockWaitTimeout),
    (Code(-908), ConnectionFailure),
    (Code(-930), ConnectionFailure),
    (Code(-951), ConnectionFailure),
    (Code(-25580), ConnectionFailure),
    (SqlStateClass("08"), ConnectionFailure),
];

pub(crate) static DB2: &[Rule] = &[
    (Code(-803), UniqueConstraintViolation),
    (Code(-530), ForeignKeyConstraintViolation),
    (Code(-531), ForeignKeyConstraintViolation),
    (Code(-532), ForeignKeyConstraintViolation),
    (Code(-407), NotNullConstraintViolation),
    (Code(-206), InvalidFieldName),
    (Code(-203), AmbiguousFieldName),
    (Code(-204), TableNotFound),
    (Code(-601), TableAlreadyExists),
    (Code(-104), SyntaxError),
    (Code(-911), Deadlock),
    (Code(-913), LockWaitTimeout),
    (Code(-817), ReadOnly),
    (Code(-1336), ConnectionFailure),
    (Code(-30081), ConnectionFailure),
    (Code(-30082), ConnectionFailure),
    (SqlState("23505"), UniqueConstraintViolation),
    (SqlState("40001"), Deadlock),
    (SqlStateClass("08"), ConnectionFailure),
];

pub(crate) static SQL_ANYWHERE: &[Rule] = &[
    (Code(-100), ConnectionFailure),
    (Code(-103), ConnectionFailure),
    (Code(-832), ConnectionFailure),
    (Code(-143), InvalidFieldName),
    (Code(-144), AmbiguousFieldName),
    (Code(-131), SyntaxError),
    (Code(-141), TableNotFound),
    (Code(-1041), TableNotFound),
    (Code(-110), TableAlreadyExists),
    (Code(-193), UniqueConstraintViolation),
    (Code(-196), UniqueConstraintViolation),
    (Code(-194), ForeignKeyConstraintViolation),
    (Code(-198), ForeignKeyConstraintViolation),
    (Code(-195), NotNullConstraintViolation),
    (Code(-210), LockWaitTimeout),
    (Code(-1175), LockWaitTimeout),
    (Code(-1281), LockWaitTimeout),
    (Code(-306), Deadlock),
    (Code(-307), Deadlock),
    (Code(-684), Deadlock),
];
