mod teacher_detail;
mod teacher_list;

pub use teacher_detail::TeacherDetailView;
pub use teacher_list::TeacherListView;
